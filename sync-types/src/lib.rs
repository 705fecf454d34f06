//! # sync-types
//!
//! Domain records for the social-sync engine.
//!
//! This crate provides the foundational types used across all social-sync crates:
//! - [`MemberId`], [`PostId`], [`RequestId`], [`MessageId`], ... - Identity types
//! - [`TargetId`] - The identity a mutation is keyed on
//! - [`Post`], [`Comment`], [`FriendRequest`], [`Message`], [`Dialog`] - Records
//! - [`Page`] - One page of a paginated remote collection
//! - [`GatewayError`] - Failures reported by the remote gateway

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod models;
mod page;

pub use error::GatewayError;
pub use ids::{CommentId, MemberId, MessageId, PostId, RequestId, SubscriptionId, TargetId};
pub use models::{
    Comment, Dialog, FriendRequest, Identified, Member, Message, Post, RequestStatus,
    Subscription,
};
pub use page::{Page, PageParams};
