//! Paginated response envelope and request parameters.

use serde::{Deserialize, Serialize};

/// One page of a remote collection.
///
/// Mirrors the backend's `{ "count": .., "results": [..] }` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of this page, in server order.
    #[serde(rename = "results")]
    pub items: Vec<T>,
    /// Total number of items in the whole collection (server hint).
    #[serde(rename = "count")]
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    /// An empty page reporting an empty collection.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Transform every item, keeping the count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

/// Offset/limit window plus resource-specific filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageParams {
    /// Number of items to skip.
    pub offset: u64,
    /// Maximum number of items to return.
    pub limit: u64,
    /// Extra query filters (e.g. `type=incoming`, `author=7`).
    pub filters: Vec<(String, String)>,
}

impl PageParams {
    /// Create params for the window `[offset, offset + limit)`.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            filters: Vec::new(),
        }
    }

    /// Add a query filter.
    pub fn with_filter(mut self, key: &str, value: impl ToString) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    /// Look up a filter value by key.
    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
