//! Paginated collection cache.
//!
//! [`PagedCollection`] binds a [`CollectionWindow`] to one gateway resource.
//! Page loads are serialised by a load gate so at most one fetch per
//! collection is in flight, and results are applied in request order.
//!
//! ```text
//! load_first() ─► gate ─► fetch(offset 0) ─► window.apply_page (replace)
//! load_more()  ─► gate ─► fetch(next)     ─► window.apply_page (append)
//! reset()      ─► generation += 1         ─► in-flight result dropped
//! ```
//!
//! The window lock is never held across a gateway call.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use sync_core::CollectionWindow;
use sync_types::{Identified, PageParams};
use tokio::sync::Mutex;

use crate::error::EngineError;
use crate::gateway::{decode_page, Gateway, Resource};

/// Read-only copy of a collection window for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot<T> {
    /// Items in window order.
    pub items: Vec<T>,
    /// Server total-count hint.
    pub total_count: u64,
    /// Whether further pages exist.
    pub has_more: bool,
}

impl<T: Identified + Clone> Snapshot<T> {
    fn of(window: &CollectionWindow<T>) -> Self {
        Self {
            items: window.items().to_vec(),
            total_count: window.total_count(),
            has_more: window.has_more(),
        }
    }
}

/// A cached, paged view of one remote collection.
pub struct PagedCollection<T: Identified, G: Gateway> {
    gateway: Arc<G>,
    resource: Resource,
    filters: Vec<(String, String)>,
    page_size: u64,
    window: Mutex<CollectionWindow<T>>,
    load_gate: Mutex<()>,
}

impl<T, G> PagedCollection<T, G>
where
    T: Identified + Clone + DeserializeOwned + Send + Sync,
    G: Gateway,
{
    /// Create an empty collection over `resource`.
    pub fn new(gateway: Arc<G>, resource: Resource, page_size: u64) -> Self {
        Self {
            gateway,
            resource,
            filters: Vec::new(),
            page_size: page_size.max(1),
            window: Mutex::new(CollectionWindow::new()),
            load_gate: Mutex::new(()),
        }
    }

    /// Add a query filter sent with every page request.
    pub fn with_filter(mut self, key: &str, value: impl ToString) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    /// The resource this collection reads.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Fetch exactly one page at `offset`.
    ///
    /// `offset == 0` replaces the window; later offsets append. On failure
    /// the window is left untouched.
    pub async fn load(&self, offset: u64, limit: u64) -> Result<Snapshot<T>, EngineError> {
        let _gate = self.load_gate.lock().await;
        self.load_locked(offset, limit).await
    }

    /// Reload from the first page.
    pub async fn load_first(&self) -> Result<Snapshot<T>, EngineError> {
        self.load(0, self.page_size).await
    }

    /// Load the page after the last one consumed.
    ///
    /// Does nothing (no fetch) once `has_more` is false.
    pub async fn load_more(&self) -> Result<Snapshot<T>, EngineError> {
        let _gate = self.load_gate.lock().await;
        let next = {
            let window = self.window.lock().await;
            if !window.has_more() {
                tracing::debug!(resource = %self.resource, "no more pages");
                return Ok(Snapshot::of(&window));
            }
            window.next_offset()
        };
        self.load_locked(next, self.page_size).await
    }

    // Caller holds the load gate.
    async fn load_locked(&self, offset: u64, limit: u64) -> Result<Snapshot<T>, EngineError> {
        let generation = self.window.lock().await.generation();
        let mut params = PageParams::new(offset, limit);
        params.filters = self.filters.clone();

        tracing::debug!(resource = %self.resource, offset, limit, "loading page");
        let page = self
            .gateway
            .fetch_page(&self.resource, &params)
            .await
            .and_then(decode_page::<T>)
            .map_err(|e| {
                tracing::warn!(resource = %self.resource, offset, error = %e, "page load failed");
                EngineError::fetch(e)
            })?;

        let mut window = self.window.lock().await;
        if window.generation() != generation {
            tracing::warn!(resource = %self.resource, offset, "discarding page for reset window");
            return Ok(Snapshot::of(&window));
        }
        let inserted = window.apply_page(offset, page);
        tracing::debug!(
            resource = %self.resource,
            offset,
            inserted,
            total = window.total_count(),
            "page applied"
        );
        Ok(Snapshot::of(&window))
    }

    /// Drop everything held. Loads in flight are discarded on arrival.
    pub async fn reset(&self) {
        self.window.lock().await.reset();
    }

    /// Current window contents.
    pub async fn snapshot(&self) -> Snapshot<T> {
        Snapshot::of(&*self.window.lock().await)
    }

    /// Whether further pages exist.
    pub async fn has_more(&self) -> bool {
        self.window.lock().await.has_more()
    }

    /// Look up an item by identifier.
    pub async fn get(&self, id: T::Id) -> Option<T> {
        self.window.lock().await.get(id).cloned()
    }

    /// Replace an item by identifier; no-op if absent.
    pub async fn replace(&self, id: T::Id, item: T) -> bool {
        self.window.lock().await.replace(id, item)
    }

    /// Replace an item with `f(current)`; no-op if absent.
    pub async fn update<F>(&self, id: T::Id, f: F) -> Option<T>
    where
        F: FnOnce(&T) -> T,
    {
        let mut window = self.window.lock().await;
        let next = f(window.get(id)?);
        window.replace(id, next.clone());
        Some(next)
    }

    /// Remove an item by identifier; no-op if absent.
    pub async fn remove(&self, id: T::Id) -> Option<T> {
        self.window.lock().await.remove(id)
    }

    /// Remove an item the backend confirmed deleted, shrinking the counters.
    pub async fn remove_confirmed(&self, id: T::Id) -> Option<T> {
        self.window.lock().await.remove_confirmed(id)
    }

    /// Insert an item the backend just created at the front.
    pub async fn insert_created_front(&self, item: T) -> bool {
        self.window.lock().await.insert_created_front(item)
    }

    /// Append an item the backend just created.
    pub async fn push_created_back(&self, item: T) -> bool {
        self.window.lock().await.push_created_back(item)
    }
}
