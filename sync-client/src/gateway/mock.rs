//! Mock gateway for testing.
//!
//! Allows queueing responses per resource, capturing every call for
//! verification, and holding calls for a resource until released so tests
//! can interleave concurrent operations deterministically.

use super::{Gateway, Operation, Resource};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use sync_types::{GatewayError, Page, PageParams};
use tokio::sync::watch;

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `fetch_page()`.
    Fetch {
        /// Resource addressed.
        resource: Resource,
        /// Requested window and filters.
        params: PageParams,
    },
    /// `mutate()`.
    Mutate {
        /// Resource addressed.
        resource: Resource,
        /// Entity identifier.
        id: u64,
        /// Operation requested.
        operation: Operation,
        /// Request body.
        body: Option<Value>,
    },
    /// `create()`.
    Create {
        /// Resource addressed.
        resource: Resource,
        /// Request body.
        body: Value,
    },
}

#[derive(Debug)]
enum Reply {
    Page(Page<Value>),
    Entity(Option<Value>),
    Error(GatewayError),
}

/// Mock gateway for testing.
///
/// Fetches with nothing queued return an empty page; mutations with nothing
/// queued succeed without a body.
#[derive(Debug)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayInner>>,
    held: Arc<watch::Sender<HashSet<Resource>>>,
}

#[derive(Debug, Default)]
struct MockGatewayInner {
    calls: Vec<Call>,
    replies: HashMap<Resource, VecDeque<Reply>>,
    fail_next: Option<GatewayError>,
}

impl MockGateway {
    /// Create a new mock gateway.
    pub fn new() -> Self {
        let (held, _) = watch::channel(HashSet::new());
        Self {
            inner: Arc::new(Mutex::new(MockGatewayInner::default())),
            held: Arc::new(held),
        }
    }

    /// Queue a page for the next fetch of `resource`.
    pub fn queue_page(&self, resource: Resource, page: Page<Value>) {
        self.push_reply(resource, Reply::Page(page));
    }

    /// Queue the entity returned by the next mutate or create on `resource`.
    pub fn queue_entity(&self, resource: Resource, entity: Value) {
        self.push_reply(resource, Reply::Entity(Some(entity)));
    }

    /// Queue a body-less success for the next mutate on `resource`.
    pub fn queue_empty(&self, resource: Resource) {
        self.push_reply(resource, Reply::Entity(None));
    }

    /// Queue a failure for the next call on `resource`.
    pub fn queue_error(&self, resource: Resource, error: GatewayError) {
        self.push_reply(resource, Reply::Error(error));
    }

    /// Cause the next call, whatever its resource, to fail.
    pub fn fail_next(&self, error: GatewayError) {
        self.lock().fail_next = Some(error);
    }

    /// Block calls on `resource` (after they are recorded) until released.
    pub fn hold(&self, resource: Resource) {
        self.held.send_modify(|held| {
            held.insert(resource);
        });
    }

    /// Let held calls on `resource` complete.
    pub fn release(&self, resource: &Resource) {
        self.held.send_modify(|held| {
            held.remove(resource);
        });
    }

    /// Let every held call complete.
    pub fn release_all(&self) {
        self.held.send_modify(|held| held.clear());
    }

    /// Get all calls that were made.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of `mutate()` calls for one entity and operation.
    pub fn mutation_count(&self, resource: &Resource, id: u64, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| {
                matches!(call, Call::Mutate { resource: r, id: i, operation: o, .. }
                    if r == resource && *i == id && *o == operation)
            })
            .count()
    }

    /// Number of `fetch_page()` calls for `resource`.
    pub fn fetch_count(&self, resource: &Resource) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Fetch { resource: r, .. } if r == resource))
            .count()
    }

    /// Get the last call that was made.
    pub fn last_call(&self) -> Option<Call> {
        self.lock().calls.last().cloned()
    }

    /// Clear calls, queued replies and held resources.
    pub fn reset(&self) {
        *self.lock() = MockGatewayInner::default();
        self.release_all();
    }

    fn push_reply(&self, resource: Resource, reply: Reply) {
        self.lock()
            .replies
            .entry(resource)
            .or_default()
            .push_back(reply);
    }

    // Test helper: a poisoned lock only means another test thread panicked.
    fn lock(&self) -> MutexGuard<'_, MockGatewayInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call` and take the reply for it.
    fn accept(&self, resource: &Resource, call: Call) -> Option<Reply> {
        let mut inner = self.lock();
        inner.calls.push(call);

        // Check for forced failure
        if let Some(error) = inner.fail_next.take() {
            return Some(Reply::Error(error));
        }
        inner
            .replies
            .get_mut(resource)
            .and_then(|queue| queue.pop_front())
    }

    async fn wait_while_held(&self, resource: &Resource) {
        let mut rx = self.held.subscribe();
        while rx.borrow_and_update().contains(resource) {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            held: Arc::clone(&self.held),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_page(
        &self,
        resource: &Resource,
        params: &PageParams,
    ) -> Result<Page<Value>, GatewayError> {
        let reply = self.accept(
            resource,
            Call::Fetch {
                resource: resource.clone(),
                params: params.clone(),
            },
        );
        self.wait_while_held(resource).await;

        match reply {
            None => Ok(Page::empty()),
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Error(error)) => Err(error),
            Some(Reply::Entity(_)) => Err(GatewayError::Decode(format!(
                "entity queued for page fetch of {}",
                resource
            ))),
        }
    }

    async fn mutate(
        &self,
        resource: &Resource,
        id: u64,
        operation: Operation,
        body: Option<Value>,
    ) -> Result<Option<Value>, GatewayError> {
        let reply = self.accept(
            resource,
            Call::Mutate {
                resource: resource.clone(),
                id,
                operation,
                body,
            },
        );
        self.wait_while_held(resource).await;

        match reply {
            None => Ok(None),
            Some(Reply::Entity(entity)) => Ok(entity),
            Some(Reply::Error(error)) => Err(error),
            Some(Reply::Page(_)) => Err(GatewayError::Decode(format!(
                "page queued for mutation of {}",
                resource
            ))),
        }
    }

    async fn create(&self, resource: &Resource, body: Value) -> Result<Value, GatewayError> {
        let reply = self.accept(
            resource,
            Call::Create {
                resource: resource.clone(),
                body,
            },
        );
        self.wait_while_held(resource).await;

        match reply {
            Some(Reply::Entity(Some(entity))) => Ok(entity),
            Some(Reply::Error(error)) => Err(error),
            _ => Err(GatewayError::Network(format!(
                "no entity queued for create on {}",
                resource
            ))),
        }
    }
}
