//! Identity registry: display name → live connection.
//!
//! Player names are exclusive: a second connection cannot claim a name until
//! the first one releases it. The reserved admin name is the exception and a
//! new admin login always takes the binding over, so the operator can
//! reconnect from a fresh console while the old one is still draining.
//!
//! Unbinding is conditional on the caller still owning the binding. A late
//! disconnect from a superseded connection must not evict the newer login.

use std::collections::BTreeMap;

use crate::error::SessionError;

/// Role derived from a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The reserved operator name
    Admin,
    /// Any other name
    Player,
}

impl Role {
    /// Whether this is the admin role.
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

/// Registry binding display names to connection (session) IDs.
///
/// Names are case-sensitive. Iteration order is sorted by name, which keeps
/// online listings stable.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    /// The one name that resolves to [`Role::Admin`]
    admin_name: String,
    /// Username → session ID
    bindings: BTreeMap<String, u64>,
}

impl IdentityRegistry {
    /// Create an empty registry with the given admin name.
    pub fn new(admin_name: impl Into<String>) -> Self {
        Self { admin_name: admin_name.into(), bindings: BTreeMap::new() }
    }

    /// The reserved admin name.
    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    /// Role for a display name.
    pub fn role_of(&self, username: &str) -> Role {
        if username == self.admin_name { Role::Admin } else { Role::Player }
    }

    /// Bind a name to a connection.
    ///
    /// Admin binds always succeed and return the connection they replaced, if
    /// any. Player binds succeed only when the name is free.
    ///
    /// # Errors
    ///
    /// - `SessionError::LoginConflict` if a player name is already bound. The
    ///   registry is left unchanged.
    pub fn bind(&mut self, username: &str, session_id: u64) -> Result<Option<u64>, SessionError> {
        if self.role_of(username).is_admin() {
            let previous = self.bindings.insert(username.to_string(), session_id);
            return Ok(previous.filter(|&prev| prev != session_id));
        }

        if let Some(&holder) = self.bindings.get(username) {
            return Err(SessionError::LoginConflict { username: username.to_string(), holder });
        }

        self.bindings.insert(username.to_string(), session_id);
        Ok(None)
    }

    /// Release a binding if `session_id` still owns it.
    ///
    /// Returns `true` if the binding was removed. A mismatch (stale
    /// disconnect after an admin override) is a no-op.
    pub fn unbind(&mut self, username: &str, session_id: u64) -> bool {
        if self.bindings.get(username) == Some(&session_id) {
            self.bindings.remove(username);
            true
        } else {
            false
        }
    }

    /// Whether any connection currently holds this name.
    pub fn is_bound(&self, username: &str) -> bool {
        self.bindings.contains_key(username)
    }

    /// Connection currently holding this name.
    pub fn holder(&self, username: &str) -> Option<u64> {
        self.bindings.get(username).copied()
    }

    /// Whether a player bind for this name by `session_id` would be refused.
    ///
    /// Never mutates. Admin names never conflict.
    pub fn would_conflict(&self, username: &str, session_id: u64) -> bool {
        !self.role_of(username).is_admin()
            && self.holder(username).is_some_and(|holder| holder != session_id)
    }

    /// Online names in sorted order.
    pub fn online(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of bound names.
    pub fn online_count(&self) -> usize {
        self.bindings.len()
    }
}
