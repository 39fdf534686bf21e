//! Standard invariant checks.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Each username appears in the roster at most once.
pub struct RosterUnique;

impl Invariant for RosterUnique {
    fn name(&self) -> &'static str {
        "roster_unique"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for username in &state.roster {
            if !seen.insert(username) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{username:?} queued twice in {:?}", state.roster),
                });
            }
        }
        Ok(())
    }
}

/// Every authenticated session holds the binding for its name, and no
/// binding exists without a session.
pub struct SessionsMatchBindings;

impl Invariant for SessionsMatchBindings {
    fn name(&self) -> &'static str {
        "sessions_match_bindings"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let holder = state.bindings.get(&session.username).copied();
            if holder != Some(session.session_id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "session {} is logged in as {:?} but the name is held by {holder:?}",
                        session.session_id, session.username
                    ),
                });
            }
        }

        if state.bindings.len() != state.sessions.len() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} bindings for {} sessions",
                    state.bindings.len(),
                    state.sessions.len()
                ),
            });
        }
        Ok(())
    }
}

/// Only the reserved name carries the admin role.
pub struct AdminRoleReserved;

impl Invariant for AdminRoleReserved {
    fn name(&self) -> &'static str {
        "admin_role_reserved"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            if session.admin != (session.username == state.admin_name) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "session {} as {:?} has admin={}",
                        session.session_id, session.username, session.admin
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The ledger records iff the admin is online, and is empty otherwise.
pub struct LedgerFollowsPresence;

impl Invariant for LedgerFollowsPresence {
    fn name(&self) -> &'static str {
        "ledger_follows_presence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.ledger_active != state.admin_online {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "ledger active={} while admin online={}",
                    state.ledger_active, state.admin_online
                ),
            });
        }

        if !state.ledger_active && state.ledger_len > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("inactive ledger holds {} records", state.ledger_len),
            });
        }
        Ok(())
    }
}

/// Admin presence is online exactly while the admin name is bound.
pub struct AdminPresenceMatchesBinding;

impl Invariant for AdminPresenceMatchesBinding {
    fn name(&self) -> &'static str {
        "admin_presence_matches_binding"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let bound = state.bindings.contains_key(&state.admin_name);
        if bound != state.admin_online {
            return Err(Violation {
                invariant: self.name(),
                message: format!("admin bound={bound} but presence online={}", state.admin_online),
            });
        }
        Ok(())
    }
}
