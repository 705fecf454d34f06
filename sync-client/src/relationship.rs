//! Relationship resolver.
//!
//! Derives the viewer's relationship to the member currently being viewed.
//! Every resolution re-reads three sources in full, concurrently:
//!
//! ```text
//!            ┌─► friend requests (type=outgoing)        ─┐
//! resolve ───┼─► friend requests (type=incoming)        ─┼─► sync_core::resolve
//!            └─► subscriptions   (type=my_subscriptions) ─┘
//! ```
//!
//! All three must succeed. On any failure the last known relationship for
//! the target is kept and a resolution error is returned. Relationship
//! actions never patch the derived state; they re-resolve after the backend
//! confirms them.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use sync_core::{resolve, ActiveTarget, Relationship, RelationshipSources, RelationshipState};
use sync_types::{
    FriendRequest, GatewayError, Member, MemberId, PageParams, RequestId, Subscription, TargetId,
};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{decode_page, Gateway, Operation, Resource};
use crate::mutation::{MutationCoordinator, Outcome};

#[derive(Debug, Default)]
struct ResolverState {
    active: ActiveTarget<MemberId>,
    member: Option<Member>,
    relationship: Option<Relationship>,
}

/// Resolves and alters the viewer's relationship to one target member.
pub struct RelationshipResolver<G: Gateway> {
    gateway: Arc<G>,
    coordinator: MutationCoordinator,
    viewer: MemberId,
    page_size: u64,
    max_pages: u32,
    state: Mutex<ResolverState>,
}

impl<G: Gateway> RelationshipResolver<G> {
    /// Create a resolver for `viewer`.
    pub fn new(
        gateway: Arc<G>,
        coordinator: MutationCoordinator,
        viewer: MemberId,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gateway,
            coordinator,
            viewer,
            page_size: config.relationship_page_size.max(1),
            max_pages: config.relationship_max_pages.max(1),
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Resolve the relationship to `target` and make it the current target.
    ///
    /// `target` supplies the friendship indicator. A result that arrives
    /// after another target was selected is returned but not stored.
    pub async fn resolve(&self, target: &Member) -> Result<Relationship, EngineError> {
        let ticket = {
            let mut state = self.state.lock().await;
            let ticket = state.active.select(target.id);
            if state.member.as_ref().map(|m| m.id) != Some(target.id) {
                state.relationship = None;
            }
            state.member = Some(target.clone());
            ticket
        };

        tracing::debug!(member = %target.id, "resolving relationship");
        let sources = match self.fetch_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(member = %target.id, error = %e, "relationship resolution failed");
                return Err(EngineError::resolution(e));
            }
        };
        let relationship = resolve(target.id, &sources, target.friendship_hint());

        let mut state = self.state.lock().await;
        if state.active.is_current(&ticket) {
            state.relationship = Some(relationship);
        } else {
            tracing::warn!(member = %target.id, "discarding relationship for stale target");
        }
        Ok(relationship)
    }

    /// The last known relationship for the current target.
    pub async fn relationship(&self) -> Option<Relationship> {
        self.state.lock().await.relationship
    }

    /// The member currently being viewed.
    pub async fn current_target(&self) -> Option<Member> {
        self.state.lock().await.member.clone()
    }

    /// Whether a relationship action for `target` is in flight.
    pub fn is_pending(&self, target: MemberId) -> bool {
        self.coordinator.is_pending(TargetId::Member(target))
    }

    /// Send a friend request to `target`.
    pub async fn send_request(
        &self,
        target: &Member,
    ) -> Result<Outcome<Relationship>, EngineError> {
        self.check_not_self(target)?;
        let known = self.known(target).await?;
        if known.state != RelationshipState::None {
            return Err(EngineError::validation(format!(
                "cannot send a friend request while {}",
                known.state.label()
            )));
        }

        let body = json!({ "to_member": target.id });
        self.act(target, None, target.clone(), || async {
            self.gateway
                .create(&Resource::FriendRequests, body)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Accept the pending request `target` sent to the viewer.
    pub async fn accept_request(
        &self,
        target: &Member,
    ) -> Result<Outcome<Relationship>, EngineError> {
        let request = self.incoming_request(target).await?;
        let mut befriended = target.clone();
        befriended.is_friend = Some(true);

        self.act(target, Some(request), befriended, || async {
            self.gateway
                .mutate(&Resource::FriendRequests, request.value(), Operation::Accept, None)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Decline the pending request `target` sent to the viewer.
    pub async fn decline_request(
        &self,
        target: &Member,
    ) -> Result<Outcome<Relationship>, EngineError> {
        let request = self.incoming_request(target).await?;

        self.act(target, Some(request), target.clone(), || async {
            self.gateway
                .mutate(&Resource::FriendRequests, request.value(), Operation::Decline, None)
                .await
                .map(|_| ())
        })
        .await
    }

    /// End the friendship with `target`.
    pub async fn remove_friend(
        &self,
        target: &Member,
    ) -> Result<Outcome<Relationship>, EngineError> {
        let known = self.known(target).await?;
        if known.state != RelationshipState::Friends {
            return Err(EngineError::validation("not friends with this member"));
        }
        let mut former = target.clone();
        former.is_friend = Some(false);

        self.act(target, None, former, || async {
            self.gateway
                .mutate(&Resource::Friends, target.id.value(), Operation::Delete, None)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Follow `target`.
    pub async fn subscribe(&self, target: &Member) -> Result<Outcome<Relationship>, EngineError> {
        self.check_not_self(target)?;
        if self.known(target).await?.is_subscribed {
            return Err(EngineError::validation("already subscribed to this member"));
        }

        self.act(target, None, target.clone(), || async {
            self.gateway
                .mutate(&Resource::Subscriptions, target.id.value(), Operation::Subscribe, None)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Stop following `target`.
    pub async fn unsubscribe(&self, target: &Member) -> Result<Outcome<Relationship>, EngineError> {
        if !self.known(target).await?.is_subscribed {
            return Err(EngineError::validation("not subscribed to this member"));
        }

        self.act(target, None, target.clone(), || async {
            self.gateway
                .mutate(&Resource::Subscriptions, target.id.value(), Operation::Unsubscribe, None)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Run a guarded action for `target`, then re-resolve with `refreshed`
    /// as the target record.
    ///
    /// Actions on a friend request are also guarded under the request id,
    /// which the inbox guards its own accept and decline under.
    ///
    /// If the action succeeds but re-resolution fails, the resolution error
    /// is returned; the action itself is not rolled back.
    async fn act<F, Fut>(
        &self,
        target: &Member,
        request: Option<RequestId>,
        refreshed: Member,
        action: F,
    ) -> Result<Outcome<Relationship>, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), GatewayError>>,
    {
        let outcome = self
            .coordinator
            .perform(TargetId::Member(target.id), || async move {
                let dispatch = || async move { action().await.map_err(EngineError::mutation) };
                match request {
                    Some(request) => {
                        self.coordinator
                            .perform(TargetId::Request(request), dispatch)
                            .await
                    }
                    None => dispatch().await.map(Outcome::Applied),
                }
            })
            .await?;

        match outcome {
            Outcome::Applied(Outcome::Applied(())) => {
                Ok(Outcome::Applied(self.resolve(&refreshed).await?))
            }
            Outcome::Applied(Outcome::Ignored) | Outcome::Ignored => Ok(Outcome::Ignored),
        }
    }

    /// Last known relationship to `target`, resolving first if it is not
    /// the current target.
    async fn known(&self, target: &Member) -> Result<Relationship, EngineError> {
        {
            let state = self.state.lock().await;
            if state.active.current() == Some(target.id) {
                if let Some(relationship) = state.relationship {
                    return Ok(relationship);
                }
            }
        }
        self.resolve(target).await
    }

    async fn incoming_request(&self, target: &Member) -> Result<RequestId, EngineError> {
        match self.known(target).await?.state {
            RelationshipState::RequestReceived { request } => Ok(request),
            other => Err(EngineError::validation(format!(
                "no pending request from this member ({})",
                other.label()
            ))),
        }
    }

    fn check_not_self(&self, target: &Member) -> Result<(), EngineError> {
        if target.id == self.viewer {
            return Err(EngineError::validation("cannot target yourself"));
        }
        Ok(())
    }

    async fn fetch_sources(&self) -> Result<RelationshipSources, GatewayError> {
        let (outgoing, incoming, subscriptions) = tokio::try_join!(
            self.fetch_all::<FriendRequest>(Resource::FriendRequests, "outgoing"),
            self.fetch_all::<FriendRequest>(Resource::FriendRequests, "incoming"),
            self.fetch_all::<Subscription>(Resource::Subscriptions, "my_subscriptions"),
        )?;
        Ok(RelationshipSources {
            outgoing,
            incoming,
            subscriptions,
        })
    }

    /// Walk every page of one source, up to `max_pages`.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        resource: Resource,
        kind: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        let mut offset = 0u64;

        for _ in 0..self.max_pages {
            let params = PageParams::new(offset, self.page_size).with_filter("type", kind);
            let page = decode_page::<T>(self.gateway.fetch_page(&resource, &params).await?)?;
            let fetched = page.items.len() as u64;
            items.extend(page.items);
            offset += fetched;

            if fetched == 0 || offset >= page.total_count {
                return Ok(items);
            }
        }

        tracing::warn!(%resource, kind, pages = self.max_pages, "relationship source truncated");
        Ok(items)
    }
}
