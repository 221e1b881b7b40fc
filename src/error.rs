//! Crate-level error taxonomy.
//!
//! Two layers: `FetchError` covers any network/HTTP failure against the
//! clinic backend and is always non-fatal to the client core; `ChatError`
//! adds the local validation and state failures of the messaging subsystem.

use thiserror::Error;

use crate::models::Role;

/// A failed backend call: list, history, send, or any service wrapper.
///
/// Never crashes a dashboard. Callers decide between retaining stale data
/// and showing an empty state; polling retries implicitly on the next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Could not reach backend at {0}")]
    Connect(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// Non-2xx response. `message` carries the backend's envelope message
    /// when one could be decoded.
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    /// The viewer's role has no endpoint for this operation.
    #[error("No {operation} endpoint for role {role}")]
    Unsupported { operation: &'static str, role: Role },
}

/// Errors surfaced by messaging operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Empty or whitespace-only body, rejected before any network call.
    #[error("Message body is empty")]
    EmptyMessage,

    #[error("No active conversation")]
    NoActiveConversation,

    #[error("Unknown contact: {0}")]
    UnknownContact(String),

    /// Only doctors and patients have a messaging dashboard.
    #[error("Role {0} has no messaging dashboard")]
    UnsupportedRole(Role),

    #[error("Internal lock error")]
    LockPoisoned,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Status {
            status: 503,
            message: "maintenance window".into(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned HTTP 503: maintenance window"
        );

        let err = FetchError::Timeout(30);
        assert_eq!(err.to_string(), "Request timed out after 30s");
    }

    #[test]
    fn chat_error_wraps_fetch() {
        let err: ChatError = FetchError::Connect("http://localhost:3001".into()).into();
        match err {
            ChatError::Fetch(FetchError::Connect(url)) => {
                assert_eq!(url, "http://localhost:3001");
            }
            other => panic!("Expected Fetch(Connect), got: {other}"),
        }
    }

    #[test]
    fn empty_message_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "Message body is empty");
    }
}
