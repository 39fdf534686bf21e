//! Process-wide session state.
//!
//! One owned value holding the registry, roster, ledger, presence flag and
//! the per-connection session attachments. The engine is the only writer.
//!
//! # Invariants
//!
//! - Every attached session is the registry holder of its username, and
//!   every registry binding has an attached session.
//! - The ledger is active iff presence is `Online`, and empty while inactive.

use std::collections::HashMap;

use crate::{
    identity::{IdentityRegistry, Role},
    presence::AdminPresence,
    roster::ParticipantRoster,
    stats::StatsLedger,
};

/// Identity attached to a connection at login time.
///
/// The role is resolved once when the session is created, so authorization
/// is a single check on this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession<I> {
    /// Bound display name
    pub username: String,
    /// Role resolved from the name
    pub role: Role,
    /// When the login succeeded
    pub since: I,
}

/// All mutable session state.
#[derive(Debug, Clone)]
pub struct SessionState<I> {
    pub(crate) registry: IdentityRegistry,
    pub(crate) roster: ParticipantRoster,
    pub(crate) ledger: StatsLedger,
    pub(crate) presence: AdminPresence,
    /// Session ID → attached identity
    pub(crate) sessions: HashMap<u64, AuthenticatedSession<I>>,
}

impl<I> SessionState<I> {
    /// Create empty state with the given admin name.
    pub fn new(admin_name: impl Into<String>) -> Self {
        Self {
            registry: IdentityRegistry::new(admin_name),
            roster: ParticipantRoster::new(),
            ledger: StatsLedger::new(),
            presence: AdminPresence::new(),
            sessions: HashMap::new(),
        }
    }

    /// Name → connection bindings.
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Current round's participants.
    pub fn roster(&self) -> &ParticipantRoster {
        &self.roster
    }

    /// Stats for the current admin window.
    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }

    /// Admin presence flag.
    pub fn presence(&self) -> &AdminPresence {
        &self.presence
    }

    /// Identity attached to a connection, if logged in.
    pub fn session(&self, session_id: u64) -> Option<&AuthenticatedSession<I>> {
        self.sessions.get(&session_id)
    }

    /// All attached sessions.
    pub fn sessions(&self) -> impl Iterator<Item = (u64, &AuthenticatedSession<I>)> + '_ {
        self.sessions.iter().map(|(&id, session)| (id, session))
    }

    /// Number of logged-in connections.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
