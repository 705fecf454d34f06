//! # sync-core
//!
//! Pure logic for social-sync (no I/O, instant tests).
//!
//! This crate implements the collection, mutation and derivation rules of
//! the sync engine without any network access, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about how a fetched page or a confirmed mutation
//!   changes local state
//!
//! The actual I/O is performed by `sync-client`, which fetches pages and
//! dispatches mutations, then feeds the results through these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dialogs;
pub mod effects;
pub mod pending;
pub mod relationship;
pub mod target;
pub mod timeline;
pub mod window;

pub use effects::PostEffect;
pub use pending::PendingSet;
pub use relationship::{resolve, Relationship, RelationshipSources, RelationshipState};
pub use target::{ActiveTarget, Ticket};
pub use timeline::{group_by_date, MessageTimeline, TimelineEntry};
pub use window::CollectionWindow;
