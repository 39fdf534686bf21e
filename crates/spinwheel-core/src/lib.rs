//! Spinwheel session core.
//!
//! Pure, action-based logic for the wheel lottery: who is online, who is
//! queued, and the admin's stats window. Nothing here performs I/O. Callers
//! feed decoded [`ClientMessage`](spinwheel_proto::ClientMessage)s into the
//! [`SessionEngine`] and execute the [`EngineAction`]s it returns.
//!
//! # Components
//!
//! - [`IdentityRegistry`]: display name → connection, one live connection per
//!   player name, admin name overrides
//! - [`ParticipantRoster`]: ordered, username-unique queue for the round
//! - [`StatsLedger`]: join/win counters, writable only while the admin is
//!   online
//! - [`AdminPresence`]: `Offline`/`Online` state machine that resets the
//!   ledger on every transition
//! - [`SessionEngine`]: validates, authorizes, mutates, then emits
//!   notifications
//!
//! All mutation goes through [`SessionState`], which the engine owns
//! exclusively. Events are processed one at a time to completion, so no locks
//! are involved.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod env;
pub mod error;
pub mod identity;
pub mod presence;
pub mod roster;
pub mod session;
pub mod stats;

pub use engine::{EngineAction, EngineConfig, LogLevel, SessionEngine};
pub use env::Environment;
pub use error::SessionError;
pub use identity::{IdentityRegistry, Role};
pub use presence::{AdminPresence, PresenceState, PresenceTransition};
pub use roster::{CancelOutcome, JoinOutcome, ParticipantRoster};
pub use session::{AuthenticatedSession, SessionState};
pub use stats::{StatsLedger, WinOutcome};
