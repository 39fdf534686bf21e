//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing or (de)serializing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than a frame header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Header does not start with the protocol magic.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Header carries a protocol version we do not speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds the protocol limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Claimed or actual payload size
        size: usize,
        /// Maximum allowed payload size
        max: usize,
    },

    /// Fewer payload bytes than the header claims.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size claimed by the header
        expected: usize,
        /// Payload bytes actually present
        actual: usize,
    },

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed (malformed payload or unknown event).
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}

impl ProtocolError {
    /// Whether the error corrupts the byte stream.
    ///
    /// Framing errors leave the reader at an unknown offset, so the stream
    /// cannot continue. Payload errors are confined to a single frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CborEncode(_) | Self::CborDecode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_errors_are_fatal() {
        assert!(ProtocolError::InvalidMagic.is_fatal());
        assert!(ProtocolError::UnsupportedVersion(9).is_fatal());
        assert!(ProtocolError::FrameTooShort { expected: 12, actual: 3 }.is_fatal());
        assert!(ProtocolError::PayloadTooLarge { size: 1 << 20, max: 1 << 16 }.is_fatal());
    }

    #[test]
    fn payload_errors_are_not_fatal() {
        assert!(!ProtocolError::CborDecode("unknown variant".to_string()).is_fatal());
        assert!(!ProtocolError::CborEncode("io".to_string()).is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::PayloadTooLarge { size: 70_000, max: 65_536 };
        assert_eq!(err.to_string(), "payload too large: 70000 bytes (max 65536)");
    }
}
