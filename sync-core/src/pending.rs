//! Pending-operation tracking for social-sync.
//!
//! The pending set holds every target identity with a mutation in flight.
//! Entries are added before the remote call is dispatched and removed once
//! it completes, whatever the outcome. A second trigger for a target that
//! is already pending is refused, giving at most one in-flight mutation per
//! identity.

use std::collections::HashSet;
use std::hash::Hash;

/// Set of identities with a mutation in flight.
#[derive(Debug, Clone)]
pub struct PendingSet<K> {
    in_flight: HashSet<K>,
}

impl<K: Eq + Hash + Clone> PendingSet<K> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            in_flight: HashSet::new(),
        }
    }

    /// Mark `key` as in flight.
    ///
    /// Returns false, leaving the set untouched, if it already was.
    pub fn begin(&mut self, key: K) -> bool {
        self.in_flight.insert(key)
    }

    /// Clear `key` after its mutation settled.
    ///
    /// Finishing a key that is not pending is a no-op.
    pub fn finish(&mut self, key: &K) {
        self.in_flight.remove(key);
    }

    /// Whether `key` has a mutation in flight.
    pub fn contains(&self, key: &K) -> bool {
        self.in_flight.contains(key)
    }

    /// Number of in-flight mutations.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Snapshot of all in-flight keys.
    pub fn keys(&self) -> Vec<K> {
        self.in_flight.iter().cloned().collect()
    }
}

impl<K: Eq + Hash + Clone> Default for PendingSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
