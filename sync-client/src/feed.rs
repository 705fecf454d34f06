//! Feed and comment threads.
//!
//! [`Feed`] wires a [`PagedCollection`] of posts to the shared
//! [`MutationCoordinator`]. Likes, reposts and deletes are dispatched through
//! the coordinator keyed on the post, and the local copy is replaced only
//! after the backend confirms.
//!
//! [`CommentThread`] does the same for the comments under one post. It does
//! not own the post, so after adding or deleting a comment the caller
//! reports the change with [`Feed::note_comment_added`] or
//! [`Feed::note_comment_removed`].

use serde_json::json;
use std::sync::Arc;
use sync_core::PostEffect;
use sync_types::{Comment, CommentId, MemberId, Post, PostId, TargetId};

use crate::collection::{PagedCollection, Snapshot};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{decode, Gateway, Operation, Resource};
use crate::mutation::{MutationCoordinator, Outcome};

/// Paged post feed with confirmed like, repost, create and delete.
pub struct Feed<G: Gateway> {
    gateway: Arc<G>,
    coordinator: MutationCoordinator,
    posts: PagedCollection<Post, G>,
}

impl<G: Gateway> Feed<G> {
    /// The viewer's main feed.
    pub fn new(gateway: Arc<G>, coordinator: MutationCoordinator, config: &EngineConfig) -> Self {
        let posts =
            PagedCollection::new(Arc::clone(&gateway), Resource::Posts, config.feed_page_size);
        Self {
            gateway,
            coordinator,
            posts,
        }
    }

    /// The posts written by `author` (profile feed).
    pub fn for_author(
        gateway: Arc<G>,
        coordinator: MutationCoordinator,
        config: &EngineConfig,
        author: MemberId,
    ) -> Self {
        let posts =
            PagedCollection::new(Arc::clone(&gateway), Resource::Posts, config.feed_page_size)
                .with_filter("author", author);
        Self {
            gateway,
            coordinator,
            posts,
        }
    }

    /// Reload from the newest page.
    pub async fn load_first(&self) -> Result<Snapshot<Post>, EngineError> {
        self.posts.load_first().await
    }

    /// Load the next page of older posts.
    pub async fn load_more(&self) -> Result<Snapshot<Post>, EngineError> {
        self.posts.load_more().await
    }

    /// Current feed contents.
    pub async fn snapshot(&self) -> Snapshot<Post> {
        self.posts.snapshot().await
    }

    /// Look up a loaded post.
    pub async fn get(&self, id: PostId) -> Option<Post> {
        self.posts.get(id).await
    }

    /// Whether a mutation on `id` is in flight.
    pub fn is_pending(&self, id: PostId) -> bool {
        self.coordinator.is_pending(TargetId::Post(id))
    }

    /// Like the post if the viewer has not liked it, otherwise unlike it.
    ///
    /// The direction and the counter change both come from the flag held
    /// when the call is made.
    pub async fn toggle_like(&self, id: PostId) -> Result<Outcome<Post>, EngineError> {
        let before = self.loaded(id).await?;
        let was_liked = before.is_liked;
        let operation = if was_liked {
            Operation::Unlike
        } else {
            Operation::Like
        };

        let outcome = self
            .coordinator
            .perform(TargetId::Post(id), || async {
                self.gateway
                    .mutate(&Resource::Posts, id.value(), operation, None)
                    .await
                    .map_err(EngineError::mutation)
            })
            .await?;

        match outcome {
            Outcome::Applied(_) => {
                let effect = PostEffect::LikeToggled { was_liked };
                Ok(Outcome::Applied(self.apply(id, &before, effect).await))
            }
            Outcome::Ignored => Ok(Outcome::Ignored),
        }
    }

    /// Repost a post.
    pub async fn repost(&self, id: PostId) -> Result<Outcome<Post>, EngineError> {
        let before = self.loaded(id).await?;
        let outcome = self
            .coordinator
            .perform(TargetId::Post(id), || async {
                self.gateway
                    .mutate(&Resource::Posts, id.value(), Operation::Repost, Some(json!({})))
                    .await
                    .map_err(EngineError::mutation)
            })
            .await?;

        match outcome {
            Outcome::Applied(_) => Ok(Outcome::Applied(
                self.apply(id, &before, PostEffect::Reposted).await,
            )),
            Outcome::Ignored => Ok(Outcome::Ignored),
        }
    }

    /// Publish a new post and put it at the top of the feed.
    ///
    /// Rejected before any remote call when there is neither text nor
    /// media.
    pub async fn create_post(
        &self,
        content: &str,
        images: Vec<String>,
        videos: Vec<String>,
    ) -> Result<Post, EngineError> {
        let content = content.trim();
        if content.is_empty() && images.is_empty() && videos.is_empty() {
            return Err(EngineError::validation("post has no content or media"));
        }

        let mut body = json!({ "content": content });
        if !images.is_empty() {
            body["images"] = json!(images);
        }
        if !videos.is_empty() {
            body["videos"] = json!(videos);
        }

        let post: Post = self
            .gateway
            .create(&Resource::Posts, body)
            .await
            .and_then(decode)
            .map_err(|e| {
                tracing::warn!(error = %e, "post create failed");
                EngineError::mutation(e)
            })?;

        self.posts.insert_created_front(post.clone()).await;
        tracing::info!(post = %post.id, "post created");
        Ok(post)
    }

    /// Delete a post and drop it from the feed.
    pub async fn delete_post(&self, id: PostId) -> Result<Outcome<()>, EngineError> {
        let outcome = self
            .coordinator
            .perform(TargetId::Post(id), || async {
                self.gateway
                    .mutate(&Resource::Posts, id.value(), Operation::Delete, None)
                    .await
                    .map_err(EngineError::mutation)
            })
            .await?;

        if outcome.is_applied() {
            self.posts.remove_confirmed(id).await;
            return Ok(Outcome::Applied(()));
        }
        Ok(Outcome::Ignored)
    }

    /// Count a confirmed new comment on a loaded post.
    pub async fn note_comment_added(&self, id: PostId) -> Option<Post> {
        self.posts
            .update(id, |post| PostEffect::CommentAdded.apply(post))
            .await
    }

    /// Count a confirmed comment deletion on a loaded post.
    pub async fn note_comment_removed(&self, id: PostId) -> Option<Post> {
        self.posts
            .update(id, |post| PostEffect::CommentRemoved.apply(post))
            .await
    }

    async fn loaded(&self, id: PostId) -> Result<Post, EngineError> {
        self.posts
            .get(id)
            .await
            .ok_or_else(|| EngineError::validation(format!("post {} is not loaded", id)))
    }

    // The post may have been dropped by a reload while the call was in
    // flight; the transition is still reported against the captured copy.
    async fn apply(&self, id: PostId, before: &Post, effect: PostEffect) -> Post {
        match self.posts.update(id, |post| effect.apply(post)).await {
            Some(post) => post,
            None => effect.apply(before),
        }
    }
}

/// The comments under one post, oldest first.
pub struct CommentThread<G: Gateway> {
    gateway: Arc<G>,
    coordinator: MutationCoordinator,
    post: PostId,
    comments: PagedCollection<Comment, G>,
}

impl<G: Gateway> CommentThread<G> {
    /// An empty thread for `post`.
    pub fn new(
        gateway: Arc<G>,
        coordinator: MutationCoordinator,
        config: &EngineConfig,
        post: PostId,
    ) -> Self {
        let comments = PagedCollection::new(
            Arc::clone(&gateway),
            Resource::Comments { post },
            config.comment_page_size,
        );
        Self {
            gateway,
            coordinator,
            post,
            comments,
        }
    }

    /// The post this thread belongs to.
    pub fn post(&self) -> PostId {
        self.post
    }

    /// Reload from the first page.
    pub async fn load_first(&self) -> Result<Snapshot<Comment>, EngineError> {
        self.comments.load_first().await
    }

    /// Load the next page.
    pub async fn load_more(&self) -> Result<Snapshot<Comment>, EngineError> {
        self.comments.load_more().await
    }

    /// Current thread contents.
    pub async fn snapshot(&self) -> Snapshot<Comment> {
        self.comments.snapshot().await
    }

    /// Post a comment and append it to the thread.
    pub async fn add_comment(&self, content: &str) -> Result<Comment, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::validation("comment content is empty"));
        }

        let resource = Resource::Comments { post: self.post };
        let comment: Comment = self
            .gateway
            .create(&resource, json!({ "content": content }))
            .await
            .and_then(decode)
            .map_err(|e| {
                tracing::warn!(post = %self.post, error = %e, "comment create failed");
                EngineError::mutation(e)
            })?;

        self.comments.push_created_back(comment.clone()).await;
        tracing::info!(post = %self.post, comment = %comment.id, "comment added");
        Ok(comment)
    }

    /// Delete a comment and drop it from the thread.
    pub async fn delete_comment(&self, id: CommentId) -> Result<Outcome<()>, EngineError> {
        let resource = Resource::Comments { post: self.post };
        let outcome = self
            .coordinator
            .perform(TargetId::Comment(id), || async {
                self.gateway
                    .mutate(&resource, id.value(), Operation::Delete, None)
                    .await
                    .map_err(EngineError::mutation)
            })
            .await?;

        if outcome.is_applied() {
            self.comments.remove_confirmed(id).await;
            return Ok(Outcome::Applied(()));
        }
        Ok(Outcome::Ignored)
    }
}
