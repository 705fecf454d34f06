//! Remote gateway abstraction for social-sync.
//!
//! The engine never builds requests itself. It talks to the backend through
//! the [`Gateway`] trait, which exposes three calls:
//! - `fetch_page()` reads one offset/limit page of a resource
//! - `mutate()` runs an operation against one entity of a resource
//! - `create()` adds an entity to a resource
//!
//! Payloads cross the trait as `serde_json::Value`; the engine decodes them
//! into domain records with [`decode`] and [`decode_page`].
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockGateway::new();
//! gateway.queue_page(Resource::Posts, Page::new(vec![post_json], 1));
//! let page = gateway.fetch_page(&Resource::Posts, &PageParams::new(0, 10)).await?;
//! ```

mod mock;
mod rest;

pub use mock::{Call, MockGateway};
pub use rest::{RestGateway, Session};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use sync_types::{GatewayError, MemberId, Page, PageParams, PostId};

/// A remote collection addressed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Feed posts.
    Posts,
    /// Comments under one post.
    Comments {
        /// The owning post.
        post: PostId,
    },
    /// Friend requests (filter `type=incoming|outgoing`).
    FriendRequests,
    /// The viewer's friends.
    Friends,
    /// Follow relationships (filter `type=my_subscriptions|my_subscribers`).
    Subscriptions,
    /// The viewer's conversation list.
    Dialogs,
    /// Messages exchanged with one peer.
    Messages {
        /// The other participant.
        peer: MemberId,
    },
    /// Member profiles.
    Members,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Posts => write!(f, "posts"),
            Resource::Comments { post } => write!(f, "posts/{}/comments", post),
            Resource::FriendRequests => write!(f, "friends/requests"),
            Resource::Friends => write!(f, "friends"),
            Resource::Subscriptions => write!(f, "friends/subscriptions"),
            Resource::Dialogs => write!(f, "dialogs"),
            Resource::Messages { peer } => write!(f, "messages/{}", peer),
            Resource::Members => write!(f, "members"),
        }
    }
}

/// An action applied to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Like a post.
    Like,
    /// Remove the viewer's like from a post.
    Unlike,
    /// Repost a post.
    Repost,
    /// Accept an incoming friend request.
    Accept,
    /// Decline an incoming friend request.
    Decline,
    /// Follow a member.
    Subscribe,
    /// Stop following a member.
    Unsubscribe,
    /// Delete the entity.
    Delete,
    /// Mark a conversation as read.
    MarkRead,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Like => "like",
            Operation::Unlike => "unlike",
            Operation::Repost => "repost",
            Operation::Accept => "accept",
            Operation::Decline => "decline",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
            Operation::Delete => "delete",
            Operation::MarkRead => "read",
        };
        f.write_str(name)
    }
}

/// Remote gateway used by every engine component.
///
/// Implementations own authentication and transport concerns. Every call may
/// fail with a [`GatewayError`]; the engine never retries.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch one page of `resource`.
    async fn fetch_page(
        &self,
        resource: &Resource,
        params: &PageParams,
    ) -> Result<Page<Value>, GatewayError>;

    /// Run `operation` against entity `id` of `resource`.
    ///
    /// Returns the updated entity when the backend sends one back.
    async fn mutate(
        &self,
        resource: &Resource,
        id: u64,
        operation: Operation,
        body: Option<Value>,
    ) -> Result<Option<Value>, GatewayError>;

    /// Create an entity in `resource` and return it.
    async fn create(&self, resource: &Resource, body: Value) -> Result<Value, GatewayError>;
}

/// Decode one gateway payload into a record.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Decode every item of a page, keeping the count.
pub fn decode_page<T: DeserializeOwned>(page: Page<Value>) -> Result<Page<T>, GatewayError> {
    let items = page
        .items
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Page::new(items, page.total_count))
}
