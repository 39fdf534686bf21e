//! CBOR-encoded event messages.
//!
//! Each direction has one closed enum. Serde encodes them adjacently tagged,
//! so a login looks like `{ "event": "login", "data": { "username": ... } }`.
//! Decoding an unknown event name fails at the boundary instead of reaching
//! the session engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Frame, FrameHeader,
    errors::{ProtocolError, Result},
};

/// A participant queued for the current wheel round.
///
/// `index` is chosen by the client and carried through unchanged; only
/// `username` is used as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// Client-supplied slot index
    pub index: i64,
    /// Display name of the participant
    pub username: String,
}

impl ParticipantEntry {
    /// Create a new entry.
    pub fn new(index: i64, username: impl Into<String>) -> Self {
        Self { index, username: username.into() }
    }
}

/// Request to leave the roster.
///
/// Echoed verbatim to every client in `client_update_cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Participant to remove
    pub username: String,
    /// Slot index the client displayed, if it sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

impl CancelRequest {
    /// Cancel by username only.
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), index: None }
    }

    /// Cancel carrying the client's slot index.
    pub fn with_index(username: impl Into<String>, index: i64) -> Self {
        Self { username: username.into(), index: Some(index) }
    }
}

/// Join and win counters for one participant within a stats window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    /// Number of accepted joins (net of cancellations)
    pub join_count: u64,
    /// Number of rounds won
    pub win_count: u64,
}

/// Stats for every tracked participant, ordered by username.
pub type StatsSnapshot = BTreeMap<String, StatsRecord>;

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind a display name to this connection
    Login {
        /// Requested display name
        username: String,
        /// Role the client believes it has; informational only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },
    /// Release this connection's display name
    Logout,
    /// Queue a participant for the current round
    UserJoin(ParticipantEntry),
    /// Remove a participant from the current round
    UserCancel(CancelRequest),
    /// Admin queues a participant on their behalf
    AdminManualJoin(ParticipantEntry),
    /// Admin removes a participant on their behalf
    AdminManualCancel(CancelRequest),
    /// Admin started spinning (no state effect)
    AdminStartWheel,
    /// Admin stopped the wheel on a winner
    AdminStopWheel(String),
    /// Admin clears the roster
    AdminResetParticipants,
    /// Admin asks for the current stats window
    AdminRequestStats,
}

impl ClientMessage {
    /// Wire name of this event.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::UserJoin(_) => "user_join",
            Self::UserCancel(_) => "user_cancel",
            Self::AdminManualJoin(_) => "admin_manual_join",
            Self::AdminManualCancel(_) => "admin_manual_cancel",
            Self::AdminStartWheel => "admin_start_wheel",
            Self::AdminStopWheel(_) => "admin_stop_wheel",
            Self::AdminResetParticipants => "admin_reset_participants",
            Self::AdminRequestStats => "admin_request_stats",
        }
    }

    /// Whether only the admin session may invoke this event.
    #[must_use]
    pub const fn is_admin_action(&self) -> bool {
        match self {
            Self::Login { .. } | Self::Logout | Self::UserJoin(_) | Self::UserCancel(_) => false,
            Self::AdminManualJoin(_)
            | Self::AdminManualCancel(_)
            | Self::AdminStartWheel
            | Self::AdminStopWheel(_)
            | Self::AdminResetParticipants
            | Self::AdminRequestStats => true,
        }
    }

    /// Encode into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    /// - `ProtocolError::PayloadTooLarge` if the encoding does not fit a frame
    pub fn to_frame(&self) -> Result<Frame> {
        encode_payload(self)
    }

    /// Decode from a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` for malformed CBOR or unknown events
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        decode_payload(&frame.payload)
    }
}

/// Notifications sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Roster snapshot sent to a freshly connected client
    InitialState {
        /// Current roster in arrival order
        participants: Vec<ParticipantEntry>,
    },
    /// Outcome of a login attempt
    LoginStatus {
        /// Whether the name was bound to the connection
        success: bool,
        /// Human-readable outcome
        message: String,
    },
    /// A participant joined the roster
    ClientUpdateJoin(ParticipantEntry),
    /// A participant left the roster
    ClientUpdateCancel(CancelRequest),
    /// Full roster after a change
    ParticipantUpdate(Vec<ParticipantEntry>),
    /// The wheel stopped on this winner
    ClientStopWheel(String),
    /// Stats for the current admin window
    StatsData(StatsSnapshot),
}

impl ServerMessage {
    /// Wire name of this notification.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::InitialState { .. } => "initial_state",
            Self::LoginStatus { .. } => "login_status",
            Self::ClientUpdateJoin(_) => "client_update_join",
            Self::ClientUpdateCancel(_) => "client_update_cancel",
            Self::ParticipantUpdate(_) => "participant_update",
            Self::ClientStopWheel(_) => "client_stop_wheel",
            Self::StatsData(_) => "stats_data",
        }
    }

    /// Encode into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    /// - `ProtocolError::PayloadTooLarge` if the encoding does not fit a frame
    pub fn to_frame(&self) -> Result<Frame> {
        encode_payload(self)
    }

    /// Decode from a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` for malformed CBOR or unknown events
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        decode_payload(&frame.payload)
    }
}

fn encode_payload<T: Serialize>(value: &T) -> Result<Frame> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;

    let max = FrameHeader::MAX_PAYLOAD_SIZE as usize;
    if buf.len() > max {
        return Err(ProtocolError::PayloadTooLarge { size: buf.len(), max });
    }

    Ok(Frame::new(buf))
}

fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}
