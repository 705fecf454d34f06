//! Active-target tracking for stale-result discard.
//!
//! Some views follow a single selected target (the open conversation, the
//! profile being inspected). Every fetch issued for that view takes a
//! [`Ticket`] first. When the result arrives the ticket is checked against
//! the current selection; a result whose ticket is no longer current is
//! dropped without being applied.
//!
//! ```text
//! select(A) ──► ticket(A, g1) ──► fetch A ─────────────────► is_current? no → drop
//!                 select(B) ──► ticket(B, g2) ──► fetch B ──► is_current? yes → apply
//! ```

/// Proof that a fetch was issued for a particular selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket<K> {
    target: K,
    generation: u64,
}

impl<K: Copy> Ticket<K> {
    /// The target this ticket was issued for.
    pub fn target(&self) -> K {
        self.target
    }

    /// Selection generation at issue time.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The currently selected target plus a selection generation.
#[derive(Debug, Clone)]
pub struct ActiveTarget<K> {
    current: Option<K>,
    generation: u64,
}

impl<K: Copy + Eq> ActiveTarget<K> {
    /// Nothing selected.
    pub fn new() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }

    /// Select `target` and return a ticket for the fetch that follows.
    ///
    /// Re-selecting the same target still starts a new generation, so a
    /// reload supersedes any fetch already in flight for it.
    pub fn select(&mut self, target: K) -> Ticket<K> {
        self.current = Some(target);
        self.generation = self.generation.wrapping_add(1);
        Ticket {
            target,
            generation: self.generation,
        }
    }

    /// Ticket for another fetch under the current selection (e.g. older
    /// messages), or None when nothing is selected.
    pub fn ticket(&self) -> Option<Ticket<K>> {
        self.current.map(|target| Ticket {
            target,
            generation: self.generation,
        })
    }

    /// Whether a result fetched under `ticket` may still be applied.
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.current == Some(ticket.target) && self.generation == ticket.generation
    }

    /// The selected target.
    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Deselect. Outstanding tickets become stale.
    pub fn clear(&mut self) {
        self.current = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<K: Copy + Eq> Default for ActiveTarget<K> {
    fn default() -> Self {
        Self::new()
    }
}
