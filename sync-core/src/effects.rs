//! Confirmed post transitions.
//!
//! Once the backend confirms an action on a post, the local copy is replaced
//! with the result of one of these transitions. Counter arithmetic is derived
//! from the flag captured before the action was dispatched, so no re-fetch is
//! needed. Counters never go below zero.

use sync_types::Post;

/// A server-confirmed change to a post's local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEffect {
    /// Like or unlike confirmed.
    LikeToggled {
        /// `is_liked` as it was when the action was dispatched.
        was_liked: bool,
    },
    /// Repost confirmed.
    Reposted,
    /// A comment was added.
    CommentAdded,
    /// A comment was deleted.
    CommentRemoved,
}

impl PostEffect {
    /// Produce the replacement record for `post`.
    pub fn apply(self, post: &Post) -> Post {
        let mut next = post.clone();
        match self {
            PostEffect::LikeToggled { was_liked } => {
                next.is_liked = !was_liked;
                next.likes_count = if was_liked {
                    post.likes_count.saturating_sub(1)
                } else {
                    post.likes_count.saturating_add(1)
                };
            }
            PostEffect::Reposted => {
                next.reposts_count = post.reposts_count.saturating_add(1);
            }
            PostEffect::CommentAdded => {
                next.comments_count = post.comments_count.saturating_add(1);
            }
            PostEffect::CommentRemoved => {
                next.comments_count = post.comments_count.saturating_sub(1);
            }
        }
        next
    }
}
