//! # sync-client
//!
//! Async sync engine for the social-sync REST backend.
//!
//! This is the library a front end uses to keep its local view of feeds,
//! relationships and conversations consistent with the backend.
//!
//! ## Features
//!
//! - **Paged collections**: ordered, duplicate-free windows with serialised
//!   page loads and stale-result discard
//! - **Confirmed mutations**: at most one in-flight mutation per target;
//!   local state changes only after the backend confirms
//! - **Relationship resolution**: one status derived from three concurrent
//!   fetches with a fixed precedence
//! - **Conversations**: dialog list ordered by recency and a chronological
//!   timeline paged backwards
//! - **Gateway abstraction**: pluggable backend (REST, mock)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_client::{EngineConfig, Feed, MutationCoordinator, RestGateway, Session};
//!
//! let config = EngineConfig::load("social-sync.toml".as_ref())?;
//! let gateway = Arc::new(RestGateway::new(&config, Session::new(token))?);
//! let feed = Feed::new(gateway, MutationCoordinator::new(), &config);
//!
//! let page = feed.load_first().await?;
//! feed.toggle_like(page.items[0].id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod conversation;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod mutation;
pub mod relationship;
pub mod social;

pub use collection::{PagedCollection, Snapshot};
pub use config::{ConfigError, EngineConfig, DEFAULT_CONFIG_FILE};
pub use conversation::ConversationStore;
pub use error::EngineError;
pub use feed::{CommentThread, Feed};
pub use gateway::{Gateway, MockGateway, Operation, Resource, RestGateway, Session};
pub use mutation::{MutationCoordinator, Outcome};
pub use relationship::RelationshipResolver;
pub use social::FriendRequests;
