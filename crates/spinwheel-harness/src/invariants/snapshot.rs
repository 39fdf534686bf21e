//! Observable state snapshots for invariant checking.
//!
//! Snapshots copy the engine state at a point in time so that every
//! invariant sees the same consistent view.

use std::collections::BTreeMap;

use spinwheel_core::{EngineConfig, SessionState};

/// Snapshot of the whole session state.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Reserved admin display name.
    pub admin_name: String,
    /// Authenticated sessions.
    pub sessions: Vec<SessionSnapshot>,
    /// Bound display names and the session holding each.
    pub bindings: BTreeMap<String, u64>,
    /// Roster usernames in arrival order.
    pub roster: Vec<String>,
    /// Whether the stats ledger is recording.
    pub ledger_active: bool,
    /// Number of usernames in the stats ledger.
    pub ledger_len: usize,
    /// Whether admin presence is online.
    pub admin_online: bool,
}

impl SystemSnapshot {
    /// Create an empty snapshot with the default admin name.
    pub fn empty() -> Self {
        Self { admin_name: EngineConfig::default().admin_name, ..Self::default() }
    }

    /// Capture the engine's session state.
    pub fn from_state<I>(state: &SessionState<I>) -> Self {
        let registry = state.registry();

        let mut sessions: Vec<_> = state
            .sessions()
            .map(|(session_id, session)| SessionSnapshot {
                session_id,
                username: session.username.clone(),
                admin: session.role.is_admin(),
            })
            .collect();
        sessions.sort_by_key(|s| s.session_id);

        let bindings = registry
            .online()
            .filter_map(|name| registry.holder(name).map(|id| (name.to_string(), id)))
            .collect();

        Self {
            admin_name: registry.admin_name().to_string(),
            sessions,
            bindings,
            roster: state.roster().entries().iter().map(|e| e.username.clone()).collect(),
            ledger_active: state.ledger().is_active(),
            ledger_len: state.ledger().len(),
            admin_online: state.presence().is_online(),
        }
    }
}

/// One authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connection identifier.
    pub session_id: u64,
    /// Bound display name.
    pub username: String,
    /// Whether the session carries the admin role.
    pub admin: bool,
}
