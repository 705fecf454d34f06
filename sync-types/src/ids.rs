//! Identity types for social-sync.
//!
//! Every record the backend hands out carries a stable integer identifier.
//! Each kind gets its own newtype so a post id can never be passed where a
//! member id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier from its raw value.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value.
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

numeric_id!(
    /// A member (user account) of the network.
    MemberId,
    "MemberId"
);
numeric_id!(
    /// A feed post.
    PostId,
    "PostId"
);
numeric_id!(
    /// A comment on a post.
    CommentId,
    "CommentId"
);
numeric_id!(
    /// A friend request, outgoing or incoming.
    RequestId,
    "RequestId"
);
numeric_id!(
    /// A follow relationship record.
    SubscriptionId,
    "SubscriptionId"
);
numeric_id!(
    /// A direct message.
    MessageId,
    "MessageId"
);

/// The identity an optimistic mutation is keyed on.
///
/// Identifiers of different kinds share one numeric space on the backend
/// (post 5 and member 5 both exist), so the pending set keys on the kind too.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TargetId {
    /// A member, for friend and subscription actions.
    Member(MemberId),
    /// A friend request, for accept/decline.
    Request(RequestId),
    /// A post, for like/unlike/repost/delete.
    Post(PostId),
    /// A comment, for delete.
    Comment(CommentId),
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Member(id) => write!(f, "member:{}", id),
            TargetId::Request(id) => write!(f, "request:{}", id),
            TargetId::Post(id) => write!(f, "post:{}", id),
            TargetId::Comment(id) => write!(f, "comment:{}", id),
        }
    }
}

impl From<MemberId> for TargetId {
    fn from(id: MemberId) -> Self {
        TargetId::Member(id)
    }
}

impl From<RequestId> for TargetId {
    fn from(id: RequestId) -> Self {
        TargetId::Request(id)
    }
}

impl From<PostId> for TargetId {
    fn from(id: PostId) -> Self {
        TargetId::Post(id)
    }
}

impl From<CommentId> for TargetId {
    fn from(id: CommentId) -> Self {
        TargetId::Comment(id)
    }
}
