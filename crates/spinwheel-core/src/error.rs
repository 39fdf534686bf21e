//! Error types for session operations.
//!
//! None of these are fatal. Each one is a local outcome of a single event:
//! either the caller gets a targeted `login_status` reply, or nothing
//! wire-visible happens at all.

use thiserror::Error;

/// Errors raised while handling a client event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A non-admin name is already bound to another live connection.
    #[error("{username} is already online on another device")]
    LoginConflict {
        /// Name that was requested
        username: String,
        /// Connection currently holding the name
        holder: u64,
    },

    /// The requested display name is empty or too long.
    #[error("invalid username: {reason}")]
    InvalidUsername {
        /// Why the name was refused
        reason: String,
    },

    /// A non-admin connection invoked an admin-only event.
    #[error("{action} requires the admin session")]
    Unauthorized {
        /// Wire name of the denied event
        action: &'static str,
    },
}

impl SessionError {
    /// Whether the caller receives a reply for this error.
    ///
    /// Login failures are reported through `login_status`. Unauthorized admin
    /// actions are dropped without any reply.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::LoginConflict { .. } | Self::InvalidUsername { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_are_reported() {
        assert!(SessionError::LoginConflict { username: "bob".into(), holder: 1 }.is_reported());
        assert!(SessionError::InvalidUsername { reason: "empty".into() }.is_reported());
    }

    #[test]
    fn unauthorized_actions_are_silent() {
        assert!(!SessionError::Unauthorized { action: "admin_request_stats" }.is_reported());
    }

    #[test]
    fn conflict_message_names_user() {
        let err = SessionError::LoginConflict { username: "bob".into(), holder: 7 };
        assert_eq!(err.to_string(), "bob is already online on another device");
    }
}
