//! Error types for the remote gateway contract.

use std::collections::BTreeMap;
use thiserror::Error;

/// Failures a remote gateway call can report.
///
/// `Unauthorized` ends the session; everything else is the failure of one
/// operation and leaves the session usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Credentials missing, expired or rejected
    #[error("unauthorized")]
    Unauthorized,

    /// The addressed entity does not exist
    #[error("not found")]
    NotFound,

    /// The backend rejected the request body
    #[error("validation failed: {}", describe_fields(.fields))]
    ValidationFailed {
        /// Field name to the list of messages reported for it.
        fields: BTreeMap<String, Vec<String>>,
    },

    /// Transport-level failure (connect, timeout, 5xx)
    #[error("network error: {0}")]
    Network(String),

    /// The response could not be decoded into the expected record
    #[error("decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether this failure invalidates the whole session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }

    /// Build a validation failure for a single field.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        GatewayError::ValidationFailed { fields }
    }
}

fn describe_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GatewayError::Network("connection reset".into());
        assert_eq!(err.to_string(), "network error: connection reset");
    }

    #[test]
    fn validation_display_lists_fields() {
        let err = GatewayError::invalid_field("content", "This field may not be blank.");
        assert_eq!(
            err.to_string(),
            "validation failed: content: This field may not be blank."
        );
    }

    #[test]
    fn only_unauthorized_is_fatal() {
        assert!(GatewayError::Unauthorized.is_fatal());
        assert!(!GatewayError::NotFound.is_fatal());
        assert!(!GatewayError::Network("x".into()).is_fatal());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
