//! Server error types.

use std::fmt;

use crate::server_error::ServerError as DriverError;

/// Errors that can occur in the server runtime.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, missing TLS certs, etc.).
    ///
    /// These are fatal errors that prevent server startup. Fix configuration
    /// and restart.
    Config(String),

    /// Transport/network error (connection failure, I/O error, etc.).
    ///
    /// May be transient (peer vanished) or fatal (bind address in use).
    Transport(String),

    /// Protocol error (bad magic, unsupported version, oversized frame).
    ///
    /// The peer sent bytes we cannot delimit. Fatal for that stream, the
    /// server keeps serving everyone else.
    Protocol(String),

    /// Internal error (executor gone, unexpected state).
    ///
    /// Should never happen in a correct implementation.
    Internal(String),

    /// Driver error (from `ServerDriver` processing).
    Driver(DriverError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for ServerError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<spinwheel_proto::ProtocolError> for ServerError {
    fn from(err: spinwheel_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
