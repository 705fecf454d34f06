//! Optimistic mutation coordinator.
//!
//! Every user-triggered mutation runs through [`MutationCoordinator::perform`]:
//!
//! 1. If the target is already pending, the call is ignored.
//! 2. The target is added to the pending set.
//! 3. The remote action runs.
//! 4. The target is removed from the pending set, whatever the outcome.
//!
//! Local state is applied by the caller only when `perform` returns
//! [`Outcome::Applied`], i.e. after the backend confirmed the action.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::PendingSet;
use sync_types::TargetId;

use crate::error::EngineError;

/// Result of a guarded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The action ran and the backend confirmed it.
    Applied(T),
    /// A mutation for the same target was already in flight; nothing ran.
    Ignored,
}

impl<T> Outcome<T> {
    /// Whether the action ran.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// The confirmed value, if the action ran.
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Ignored => None,
        }
    }
}

/// Guards mutations so at most one per target is in flight.
///
/// Cloning shares the pending set.
#[derive(Debug, Clone, Default)]
pub struct MutationCoordinator {
    pending: Arc<Mutex<PendingSet<TargetId>>>,
}

impl MutationCoordinator {
    /// Create a coordinator with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` for `target` unless a mutation for it is already in
    /// flight.
    ///
    /// The pending entry is cleared when the action settles, and also if
    /// the returned future is dropped before then.
    pub async fn perform<F, Fut, T>(
        &self,
        target: TargetId,
        action: F,
    ) -> Result<Outcome<T>, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let Some(_entry) = PendingEntry::begin(&self.pending, target) else {
            tracing::debug!(%target, "mutation already in flight, ignoring");
            return Ok(Outcome::Ignored);
        };

        tracing::debug!(%target, "dispatching mutation");
        match action().await {
            Ok(value) => {
                tracing::info!(%target, "mutation confirmed");
                Ok(Outcome::Applied(value))
            }
            Err(e) => {
                tracing::warn!(%target, error = %e, "mutation failed");
                Err(e)
            }
        }
    }

    /// Whether `target` has a mutation in flight.
    pub fn is_pending(&self, target: TargetId) -> bool {
        lock(&self.pending).contains(&target)
    }

    /// All targets with a mutation in flight.
    pub fn pending(&self) -> Vec<TargetId> {
        lock(&self.pending).keys()
    }
}

// The set is only touched in short synchronous sections, so a poisoned lock
// still holds a consistent set.
fn lock(pending: &Mutex<PendingSet<TargetId>>) -> MutexGuard<'_, PendingSet<TargetId>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pending-set membership that ends when dropped.
struct PendingEntry<'a> {
    pending: &'a Mutex<PendingSet<TargetId>>,
    target: TargetId,
}

impl<'a> PendingEntry<'a> {
    fn begin(pending: &'a Mutex<PendingSet<TargetId>>, target: TargetId) -> Option<Self> {
        if lock(pending).begin(target) {
            Some(Self { pending, target })
        } else {
            None
        }
    }
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        lock(self.pending).finish(&self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{GatewayError, MemberId, PostId};
    use tokio::sync::oneshot;

    const POST: TargetId = TargetId::Post(PostId::new(1));

    #[tokio::test]
    async fn applied_outcome_carries_value() {
        let coordinator = MutationCoordinator::new();

        let outcome = coordinator.perform(POST, || async { Ok(7) }).await.unwrap();

        assert_eq!(outcome, Outcome::Applied(7));
        assert!(!coordinator.is_pending(POST));
    }

    #[tokio::test]
    async fn second_trigger_while_pending_is_ignored() {
        let coordinator = MutationCoordinator::new();
        let (tx, rx) = oneshot::channel::<()>();
        let dispatches = std::cell::Cell::new(0);

        let first = coordinator.perform(POST, || async {
            let _ = rx.await;
            Ok(())
        });
        let second = async {
            assert!(coordinator.is_pending(POST));
            let outcome = coordinator
                .perform(POST, || async {
                    dispatches.set(dispatches.get() + 1);
                    Ok(())
                })
                .await
                .unwrap();
            let _ = tx.send(());
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert!(first.unwrap().is_applied());
        assert_eq!(second, Outcome::Ignored);
        assert_eq!(dispatches.get(), 0);
        assert!(coordinator.pending().is_empty());
    }

    #[tokio::test]
    async fn failure_clears_pending_and_propagates() {
        let coordinator = MutationCoordinator::new();

        let result: Result<Outcome<()>, _> = coordinator
            .perform(POST, || async {
                Err(EngineError::mutation(GatewayError::Network("down".into())))
            })
            .await;

        assert!(matches!(result, Err(EngineError::Mutation(_))));
        assert!(!coordinator.is_pending(POST));

        // The target can be retried right away.
        let retry = coordinator.perform(POST, || async { Ok(()) }).await.unwrap();
        assert!(retry.is_applied());
    }

    #[tokio::test]
    async fn different_targets_run_independently() {
        let coordinator = MutationCoordinator::new();
        let member = TargetId::Member(MemberId::new(1));
        let (tx, rx) = oneshot::channel::<()>();

        let first = coordinator.perform(POST, || async {
            let _ = rx.await;
            Ok(())
        });
        let second = async {
            let outcome = coordinator.perform(member, || async { Ok(()) }).await;
            let _ = tx.send(());
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert!(first.unwrap().is_applied());
        assert!(second.unwrap().is_applied());
    }

    #[tokio::test]
    async fn dropped_mutation_releases_target() {
        let coordinator = MutationCoordinator::new();
        let (_tx, rx) = oneshot::channel::<()>();

        let mut fut = Box::pin(coordinator.perform(POST, || async {
            let _ = rx.await;
            Ok(())
        }));
        // Poll once so the entry is taken, then drop the future.
        assert!(futures_poll_once(fut.as_mut()).await);
        assert!(coordinator.is_pending(POST));
        drop(fut);

        assert!(!coordinator.is_pending(POST));
    }

    /// Poll a future a single time; true if it is still pending.
    async fn futures_poll_once<F: Future + Unpin>(fut: F) -> bool {
        let mut fut = fut;
        std::future::poll_fn(|cx| {
            let pending = std::pin::Pin::new(&mut fut).poll(cx).is_pending();
            std::task::Poll::Ready(pending)
        })
        .await
    }
}
