//! Friend request inbox and social lists.
//!
//! The inbox holds the viewer's incoming requests. Accepting or declining
//! one is guarded per request and drops it from the inbox once confirmed.
//! Relationship state for a profile is owned by the resolver, which
//! re-derives it on its next resolve.

use std::sync::Arc;
use sync_types::{FriendRequest, Member, RequestId, Subscription, TargetId};

use crate::collection::{PagedCollection, Snapshot};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{Gateway, Operation, Resource};
use crate::mutation::{MutationCoordinator, Outcome};

/// Incoming friend requests awaiting a decision.
pub struct FriendRequests<G: Gateway> {
    gateway: Arc<G>,
    coordinator: MutationCoordinator,
    inbox: PagedCollection<FriendRequest, G>,
}

impl<G: Gateway> FriendRequests<G> {
    /// An empty inbox.
    pub fn new(gateway: Arc<G>, coordinator: MutationCoordinator, config: &EngineConfig) -> Self {
        let inbox = PagedCollection::new(
            Arc::clone(&gateway),
            Resource::FriendRequests,
            config.relationship_page_size,
        )
        .with_filter("type", "incoming");
        Self {
            gateway,
            coordinator,
            inbox,
        }
    }

    /// Reload from the first page.
    pub async fn load_first(&self) -> Result<Snapshot<FriendRequest>, EngineError> {
        self.inbox.load_first().await
    }

    /// Load the next page.
    pub async fn load_more(&self) -> Result<Snapshot<FriendRequest>, EngineError> {
        self.inbox.load_more().await
    }

    /// Current inbox contents.
    pub async fn snapshot(&self) -> Snapshot<FriendRequest> {
        self.inbox.snapshot().await
    }

    /// Whether a decision on `id` is in flight.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.coordinator.is_pending(TargetId::Request(id))
    }

    /// Accept a request.
    pub async fn accept(&self, id: RequestId) -> Result<Outcome<FriendRequest>, EngineError> {
        self.decide(id, Operation::Accept).await
    }

    /// Decline a request.
    pub async fn decline(&self, id: RequestId) -> Result<Outcome<FriendRequest>, EngineError> {
        self.decide(id, Operation::Decline).await
    }

    async fn decide(
        &self,
        id: RequestId,
        operation: Operation,
    ) -> Result<Outcome<FriendRequest>, EngineError> {
        let Some(request) = self.inbox.get(id).await else {
            return Err(EngineError::validation(format!(
                "request {} is not in the inbox",
                id
            )));
        };

        let outcome = self
            .coordinator
            .perform(TargetId::Request(id), || async {
                self.gateway
                    .mutate(&Resource::FriendRequests, id.value(), operation, None)
                    .await
                    .map_err(EngineError::mutation)
            })
            .await?;

        match outcome {
            Outcome::Applied(_) => {
                self.inbox.remove_confirmed(id).await;
                tracing::info!(request = %id, %operation, "request settled");
                Ok(Outcome::Applied(request))
            }
            Outcome::Ignored => Ok(Outcome::Ignored),
        }
    }
}

/// The viewer's friends.
pub fn friends<G: Gateway>(gateway: Arc<G>, config: &EngineConfig) -> PagedCollection<Member, G> {
    PagedCollection::new(gateway, Resource::Friends, config.relationship_page_size)
}

/// Members the viewer follows.
pub fn following<G: Gateway>(
    gateway: Arc<G>,
    config: &EngineConfig,
) -> PagedCollection<Subscription, G> {
    PagedCollection::new(gateway, Resource::Subscriptions, config.relationship_page_size)
        .with_filter("type", "my_subscriptions")
}

/// Members following the viewer.
pub fn followers<G: Gateway>(
    gateway: Arc<G>,
    config: &EngineConfig,
) -> PagedCollection<Subscription, G> {
    PagedCollection::new(gateway, Resource::Subscriptions, config.relationship_page_size)
        .with_filter("type", "my_subscribers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Call, MockGateway};
    use serde_json::{json, Value};
    use sync_types::{GatewayError, Page};

    fn request_json(id: u64, from: u64) -> Value {
        json!({
            "id": id,
            "from_member": {"id": from, "username": format!("m{}", from)},
            "to_member": {"id": 100, "username": "viewer"},
            "status": "pending",
            "created_at": "2024-03-01T10:00:00Z",
        })
    }

    async fn inbox(gateway: &MockGateway, requests: Vec<Value>) -> FriendRequests<MockGateway> {
        let total = requests.len() as u64;
        gateway.queue_page(Resource::FriendRequests, Page::new(requests, total));
        let inbox = FriendRequests::new(
            Arc::new(gateway.clone()),
            MutationCoordinator::new(),
            &EngineConfig::default(),
        );
        inbox.load_first().await.unwrap();
        inbox
    }

    // ===========================================
    // Inbox Tests
    // ===========================================

    #[tokio::test]
    async fn inbox_requests_incoming_only() {
        let gateway = MockGateway::new();
        inbox(&gateway, vec![]).await;

        let Some(Call::Fetch { params, .. }) = gateway.last_call() else {
            panic!("expected a fetch");
        };
        assert_eq!(params.filter("type"), Some("incoming"));
    }

    #[tokio::test]
    async fn accepted_request_leaves_inbox() {
        let gateway = MockGateway::new();
        let inbox = inbox(&gateway, vec![request_json(9, 42), request_json(10, 43)]).await;

        let settled = inbox.accept(RequestId::new(9)).await.unwrap().applied().unwrap();

        assert_eq!(settled.from_member.id.value(), 42);
        let snapshot = inbox.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.total_count, 1);
        assert_eq!(
            gateway.mutation_count(&Resource::FriendRequests, 9, Operation::Accept),
            1
        );
    }

    #[tokio::test]
    async fn failed_decline_keeps_request() {
        let gateway = MockGateway::new();
        let inbox = inbox(&gateway, vec![request_json(9, 42)]).await;
        gateway.queue_error(Resource::FriendRequests, GatewayError::NotFound);

        let err = inbox.decline(RequestId::new(9)).await.unwrap_err();

        assert!(matches!(err, EngineError::Mutation(GatewayError::NotFound)));
        assert_eq!(inbox.snapshot().await.items.len(), 1);
        assert!(!inbox.is_pending(RequestId::new(9)));
    }

    #[tokio::test]
    async fn double_accept_dispatches_once() {
        let gateway = MockGateway::new();
        let inbox = inbox(&gateway, vec![request_json(9, 42)]).await;
        gateway.hold(Resource::FriendRequests);

        let first = inbox.accept(RequestId::new(9));
        let second = async {
            tokio::task::yield_now().await;
            let outcome = inbox.accept(RequestId::new(9)).await;
            gateway.release_all();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap().is_applied());
        assert_eq!(second.unwrap(), Outcome::Ignored);
        assert_eq!(
            gateway.mutation_count(&Resource::FriendRequests, 9, Operation::Accept),
            1
        );
    }

    #[tokio::test]
    async fn unknown_request_is_rejected() {
        let gateway = MockGateway::new();
        let inbox = inbox(&gateway, vec![]).await;

        let err = inbox.accept(RequestId::new(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    // ===========================================
    // Social List Tests
    // ===========================================

    #[tokio::test]
    async fn follow_lists_use_type_filters() {
        let gateway = MockGateway::new();
        let shared = Arc::new(gateway.clone());
        let config = EngineConfig::default();

        following(Arc::clone(&shared), &config).load_first().await.unwrap();
        followers(Arc::clone(&shared), &config).load_first().await.unwrap();
        friends(shared, &config).load_first().await.unwrap();

        let calls: Vec<(Resource, Option<String>)> = gateway
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fetch { resource, params } => {
                    Some((resource, params.filter("type").map(str::to_string)))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            calls,
            vec![
                (Resource::Subscriptions, Some("my_subscriptions".to_string())),
                (Resource::Subscriptions, Some("my_subscribers".to_string())),
                (Resource::Friends, None),
            ]
        );
    }
}
