//! Driver error types.
//!
//! Provides strongly-typed errors for driver operations:
//! - Connection bookkeeping (registration, lookup)
//! - Action execution (send to a connection's outbound channel)
//!
//! Payload decode and encode failures never surface here; the driver turns
//! them into `Log` actions.

use thiserror::Error;

/// Errors that can occur while the driver processes an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Session not found in registry.
    ///
    /// A frame or close arrived for a connection the driver never accepted
    /// or already released. Usually a close racing a final frame.
    #[error("session not found: {0}")]
    SessionNotFound(u64),

    /// Session already registered.
    ///
    /// The executor hands out unused IDs, so only a caller driving the
    /// driver directly can hit this.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(u64),
}

/// Errors from action execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Send to session failed.
    ///
    /// The connection's outbound channel is gone. The connection is closing
    /// and its close event is already queued.
    #[error("send failed for session {session_id}: {reason}")]
    SendFailed {
        /// Session that failed
        session_id: u64,
        /// Error message
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::SessionNotFound(42);
        assert_eq!(err.to_string(), "session not found: 42");

        let err = ServerError::SessionAlreadyExists(123);
        assert_eq!(err.to_string(), "session already exists: 123");
    }

    #[test]
    fn executor_error_display() {
        let err = ExecutorError::SendFailed { session_id: 42, reason: "closed".to_string() };
        assert_eq!(err.to_string(), "send failed for session 42: closed");
    }
}
