//! Engine error taxonomy.
//!
//! Every engine operation returns [`EngineError`]. Gateway failures are
//! converted at the operation boundary: `Unauthorized` always becomes
//! [`EngineError::SessionExpired`], anything else becomes the variant of the
//! operation that was running.

use sync_types::GatewayError;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A page load failed. The window is unchanged.
    #[error("fetch failed: {0}")]
    Fetch(GatewayError),

    /// A mutation failed. No local state was applied.
    #[error("mutation failed: {0}")]
    Mutation(GatewayError),

    /// One of the relationship source fetches failed. The last known
    /// relationship is kept.
    #[error("relationship resolution failed: {0}")]
    Resolution(GatewayError),

    /// A client-side precondition failed before any remote call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The backend rejected the session credentials.
    #[error("session expired")]
    SessionExpired,
}

impl EngineError {
    /// Wrap a page-load failure.
    pub fn fetch(err: GatewayError) -> Self {
        Self::classify(err, EngineError::Fetch)
    }

    /// Wrap a mutation failure.
    pub fn mutation(err: GatewayError) -> Self {
        Self::classify(err, EngineError::Mutation)
    }

    /// Wrap a relationship fetch failure.
    pub fn resolution(err: GatewayError) -> Self {
        Self::classify(err, EngineError::Resolution)
    }

    /// Client-side precondition failure.
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation(reason.into())
    }

    /// Whether the session must be re-established.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, EngineError::SessionExpired)
    }

    fn classify(err: GatewayError, wrap: fn(GatewayError) -> EngineError) -> Self {
        if err.is_fatal() {
            EngineError::SessionExpired
        } else {
            wrap(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_becomes_session_expired_everywhere() {
        assert_eq!(
            EngineError::fetch(GatewayError::Unauthorized),
            EngineError::SessionExpired
        );
        assert_eq!(
            EngineError::mutation(GatewayError::Unauthorized),
            EngineError::SessionExpired
        );
        assert!(EngineError::resolution(GatewayError::Unauthorized).is_session_expired());
    }

    #[test]
    fn other_failures_keep_their_operation() {
        let err = EngineError::mutation(GatewayError::NotFound);
        assert_eq!(err, EngineError::Mutation(GatewayError::NotFound));
        assert!(!err.is_session_expired());

        let err = EngineError::fetch(GatewayError::Network("reset".into()));
        assert_eq!(err.to_string(), "fetch failed: network error: reset");
    }

    #[test]
    fn validation_display() {
        let err = EngineError::validation("message content is empty");
        assert_eq!(err.to_string(), "invalid request: message content is empty");
    }
}
