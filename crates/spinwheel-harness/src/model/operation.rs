//! Operations for model-based testing.
//!
//! Operations are generated by proptest (or decoded from fuzz input) and
//! applied to both the model and the real driver.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;

/// Connection identifier (reduced modulo [`CONNECTION_POOL`]).
pub type ConnId = u8;

/// Number of distinct connections operations address.
pub const CONNECTION_POOL: u8 = 4;

/// Reserved admin name used by the model.
pub const MODEL_ADMIN: &str = "backy";

/// Display names operations pick from. Small so logins and joins collide.
const NAME_POOL: [&str; 4] = ["alice", "bob", "carol", MODEL_ADMIN];

/// Name chosen by an operation.
///
/// Mostly drawn from a small pool; a few values map to names the server must
/// reject or drop (empty, blank, over-long).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct ModelName(pub u8);

impl ModelName {
    /// Expand to the display name.
    pub fn as_string(self) -> String {
        match self.0 % 8 {
            n @ 0..=3 => NAME_POOL[n as usize].to_string(),
            4 => String::new(),
            5 => "   ".to_string(),
            6 => "x".repeat(65),
            _ => NAME_POOL[0].to_string(),
        }
    }
}

/// Operations that can be applied to the system.
///
/// Every operation comes from one connection. Operating on a connection that
/// is not open opens it first.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Bind a display name.
    Login {
        /// Connection sending the event.
        conn: ConnId,
        /// Requested name.
        name: ModelName,
    },
    /// Release the connection's name.
    Logout {
        /// Connection sending the event.
        conn: ConnId,
    },
    /// Queue a participant.
    Join {
        /// Connection sending the event.
        conn: ConnId,
        /// Participant name.
        name: ModelName,
        /// Client-chosen slot index.
        index: i8,
    },
    /// Remove a participant.
    Cancel {
        /// Connection sending the event.
        conn: ConnId,
        /// Participant name.
        name: ModelName,
    },
    /// Admin queues a participant.
    ManualJoin {
        /// Connection sending the event.
        conn: ConnId,
        /// Participant name.
        name: ModelName,
        /// Client-chosen slot index.
        index: i8,
    },
    /// Admin removes a participant.
    ManualCancel {
        /// Connection sending the event.
        conn: ConnId,
        /// Participant name.
        name: ModelName,
    },
    /// Admin starts the wheel.
    StartWheel {
        /// Connection sending the event.
        conn: ConnId,
    },
    /// Admin stops the wheel on a winner.
    StopWheel {
        /// Connection sending the event.
        conn: ConnId,
        /// Winner name.
        winner: ModelName,
    },
    /// Admin clears the roster.
    Reset {
        /// Connection sending the event.
        conn: ConnId,
    },
    /// Admin asks for stats.
    RequestStats {
        /// Connection sending the event.
        conn: ConnId,
    },
    /// Connection closes.
    Disconnect {
        /// Connection closing.
        conn: ConnId,
    },
}

impl Operation {
    /// Connection this operation comes from, reduced into the pool.
    pub fn conn(&self) -> ConnId {
        let conn = match self {
            Self::Login { conn, .. }
            | Self::Logout { conn }
            | Self::Join { conn, .. }
            | Self::Cancel { conn, .. }
            | Self::ManualJoin { conn, .. }
            | Self::ManualCancel { conn, .. }
            | Self::StartWheel { conn }
            | Self::StopWheel { conn, .. }
            | Self::Reset { conn }
            | Self::RequestStats { conn }
            | Self::Disconnect { conn } => *conn,
        };
        conn % CONNECTION_POOL
    }

    /// Whether only the admin may perform this operation.
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::ManualJoin { .. }
                | Self::ManualCancel { .. }
                | Self::StartWheel { .. }
                | Self::StopWheel { .. }
                | Self::Reset { .. }
                | Self::RequestStats { .. }
        )
    }
}

/// Outcome of applying an operation, compared between model and real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Login bound the name.
    LoginAccepted,
    /// Login was refused.
    LoginRejected,
    /// Admin-only operation from a non-admin; silently dropped.
    Denied,
    /// Stats reply as `username -> (joins, wins)`.
    Stats(BTreeMap<String, (u64, u64)>),
    /// Disconnect of a connection that was never opened.
    NotConnected,
    /// Anything else.
    Ok,
}
