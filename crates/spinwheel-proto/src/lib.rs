//! Spinwheel wire protocol.
//!
//! Every message on a connection is a [`Frame`]: a fixed 12-byte binary header
//! followed by a CBOR payload. Payloads are adjacently tagged event enums
//! (`{ "event": ..., "data": ... }`), one enum per direction:
//!
//! - [`ClientMessage`]: client → server events (login, join, admin actions)
//! - [`ServerMessage`]: server → client notifications (roster updates,
//!   login status, stats)
//!
//! The header is raw binary so the transport can delimit frames without
//! touching CBOR. Payload decoding happens once, at the server boundary, so
//! everything past the driver works with closed, typed enums.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
mod frame;
mod header;
pub mod message;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use message::{
    CancelRequest, ClientMessage, ParticipantEntry, ServerMessage, StatsRecord, StatsSnapshot,
};

/// ALPN identifier negotiated on QUIC connections.
pub const ALPN_PROTOCOL: &[u8] = b"spinwheel";
