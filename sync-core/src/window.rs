//! Collection window for social-sync.
//!
//! This module provides the locally held slice of a paginated remote
//! collection with:
//! - Replace-on-first-page, append-on-load-more, prepend-on-scroll-up
//! - A total-count hint and `has_more` derived from server positions consumed
//! - Replace/remove by identifier for confirmed mutations
//! - A generation counter so late results for a reset window can be dropped
//!
//! The window never talks to the network. sync-client feeds it pages in the
//! order their requests were issued.

use std::collections::HashSet;
use sync_types::{Identified, Page};

/// Ordered, duplicate-free slice of a remote collection.
///
/// `loaded` counts server positions consumed (offset of the last applied
/// page plus its length), which is what `has_more` compares against the
/// total-count hint. It can exceed `items.len()` when a page overlapped
/// items already held.
#[derive(Debug, Clone)]
pub struct CollectionWindow<T: Identified> {
    items: Vec<T>,
    total_count: u64,
    loaded: u64,
    generation: u64,
}

impl<T: Identified> CollectionWindow<T> {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            loaded: 0,
            generation: 0,
        }
    }

    /// Apply one fetched page requested at `offset`.
    ///
    /// `offset == 0` replaces the whole sequence; later offsets append.
    /// Returns the number of items inserted.
    pub fn apply_page(&mut self, offset: u64, page: Page<T>) -> usize {
        let fetched = page.items.len() as u64;
        self.total_count = page.total_count;

        if offset == 0 {
            self.items.clear();
        }
        let inserted = self.extend_unique(page.items, Placement::Back);

        self.loaded = offset.saturating_add(fetched).max(self.items.len() as u64);
        inserted
    }

    /// Apply a page of older items requested at `offset`, placing them in
    /// front of the current sequence.
    ///
    /// `offset == 0` replaces the whole sequence, same as [`apply_page`].
    ///
    /// [`apply_page`]: Self::apply_page
    pub fn apply_older_page(&mut self, offset: u64, page: Page<T>) -> usize {
        if offset == 0 {
            return self.apply_page(0, page);
        }

        let fetched = page.items.len() as u64;
        self.total_count = page.total_count;
        let inserted = self.extend_unique(page.items, Placement::Front);
        self.loaded = offset.saturating_add(fetched).max(self.items.len() as u64);
        inserted
    }

    /// Whether the server reports more items than have been consumed.
    pub fn has_more(&self) -> bool {
        self.total_count > self.loaded
    }

    /// Offset to request for the next page.
    pub fn next_offset(&self) -> u64 {
        self.loaded
    }

    /// Replace the item with identifier `id`.
    ///
    /// No-op (returns false) when the item is not held.
    pub fn replace(&mut self, id: T::Id, item: T) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Remove the item with identifier `id`.
    ///
    /// No-op (returns None) when the item is not held.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let index = self.items.iter().position(|existing| existing.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Remove an item and shrink the counters to match a server-side delete.
    pub fn remove_confirmed(&mut self, id: T::Id) -> Option<T> {
        let removed = self.remove(id)?;
        self.total_count = self.total_count.saturating_sub(1);
        self.loaded = self.loaded.saturating_sub(1);
        Some(removed)
    }

    /// Insert a newly created item at the front (newest-first collections).
    ///
    /// Grows the counters to match a server-side create. Returns false if an
    /// item with the same identifier is already held.
    pub fn insert_created_front(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.insert(0, item);
        self.total_count = self.total_count.saturating_add(1);
        self.loaded = self.loaded.saturating_add(1);
        true
    }

    /// Append a newly created item at the back (oldest-first collections).
    ///
    /// Grows the counters to match a server-side create. Returns false if an
    /// item with the same identifier is already held.
    pub fn push_created_back(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        self.total_count = self.total_count.saturating_add(1);
        self.loaded = self.loaded.saturating_add(1);
        true
    }

    /// Look up an item by identifier.
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Whether an item with this identifier is held.
    pub fn contains(&self, id: T::Id) -> bool {
        self.get(id).is_some()
    }

    /// Reorder the held items. The comparator must be total.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.items.sort_by(compare);
    }

    /// The held items, in window order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the window holds nothing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total-count hint from the last applied page.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Current generation; bumped by [`reset`](Self::reset).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop all items and start a new generation.
    ///
    /// Results fetched under the previous generation must be discarded by
    /// the caller.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total_count = 0;
        self.loaded = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn extend_unique(&mut self, incoming: Vec<T>, placement: Placement) -> usize {
        let mut seen: HashSet<T::Id> = self.items.iter().map(|item| item.id()).collect();
        let fresh: Vec<T> = incoming
            .into_iter()
            .filter(|item| seen.insert(item.id()))
            .collect();
        let inserted = fresh.len();

        match placement {
            Placement::Back => self.items.extend(fresh),
            Placement::Front => {
                self.items.splice(0..0, fresh);
            }
        }
        inserted
    }
}

impl<T: Identified> Default for CollectionWindow<T> {
    fn default() -> Self {
        Self::new()
    }
}

enum Placement {
    Front,
    Back,
}
