//! Admin presence state machine.
//!
//! ```text
//!            login (resets stats)
//!   Offline ──────────────────────▶ Online ──┐
//!      ▲                              │      │ login (resets stats)
//!      └──────────────────────────────┘ ◀────┘
//!          logout / disconnect (resets stats)
//! ```
//!
//! Every admin login opens a fresh stats window, including a re-login while
//! already online. Logging out while offline is not a transition.

use crate::stats::StatsLedger;

/// Admin presence states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceState {
    /// No admin connection is bound
    #[default]
    Offline,
    /// An admin connection is bound and stats are recording
    Online,
}

/// A transition taken by [`AdminPresence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceTransition {
    /// State before the event
    pub from: PresenceState,
    /// State after the event
    pub to: PresenceState,
}

/// Two-state admin presence flag that owns the ledger's activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminPresence {
    state: PresenceState,
}

impl AdminPresence {
    /// Create in the `Offline` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Whether the admin is online.
    pub fn is_online(&self) -> bool {
        self.state == PresenceState::Online
    }

    /// Admin logged in. Always enters `Online` and resets the ledger.
    pub fn login(&mut self, ledger: &mut StatsLedger) -> PresenceTransition {
        let from = self.state;
        self.state = PresenceState::Online;
        ledger.reset();
        ledger.set_active(true);

        PresenceTransition { from, to: self.state }
    }

    /// Admin logged out or disconnected.
    ///
    /// Returns `None` if already offline; the ledger is left alone.
    pub fn logout(&mut self, ledger: &mut StatsLedger) -> Option<PresenceTransition> {
        if self.state == PresenceState::Offline {
            return None;
        }

        self.state = PresenceState::Offline;
        ledger.reset();
        ledger.set_active(false);

        Some(PresenceTransition { from: PresenceState::Online, to: PresenceState::Offline })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_offline_with_inactive_ledger() {
        let presence = AdminPresence::new();
        let ledger = StatsLedger::new();

        assert_eq!(presence.state(), PresenceState::Offline);
        assert!(!ledger.is_active());
    }

    #[test]
    fn login_activates_and_resets() {
        let mut presence = AdminPresence::new();
        let mut ledger = StatsLedger::new();

        let transition = presence.login(&mut ledger);
        assert_eq!(transition, PresenceTransition {
            from: PresenceState::Offline,
            to: PresenceState::Online
        });
        assert!(ledger.is_active());

        ledger.record_join("alice");
        assert_eq!(ledger.len(), 1);

        // Re-login while online starts a fresh window
        let transition = presence.login(&mut ledger);
        assert_eq!(transition.from, PresenceState::Online);
        assert!(ledger.is_empty());
        assert!(ledger.is_active());
    }

    #[test]
    fn logout_deactivates_and_resets() {
        let mut presence = AdminPresence::new();
        let mut ledger = StatsLedger::new();
        presence.login(&mut ledger);
        ledger.record_join("alice");

        assert!(presence.logout(&mut ledger).is_some());
        assert!(!presence.is_online());
        assert!(!ledger.is_active());
        assert!(ledger.is_empty());
    }

    #[test]
    fn logout_while_offline_is_not_a_transition() {
        let mut presence = AdminPresence::new();
        let mut ledger = StatsLedger::new();

        assert_eq!(presence.logout(&mut ledger), None);
        assert_eq!(presence.state(), PresenceState::Offline);
    }
}
