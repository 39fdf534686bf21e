//! Connection registry for transport-level session tracking.
//!
//! Tracks every accepted connection, logged in or not. Identity lives in the
//! engine; this only knows which session IDs are open, when they opened and
//! how much traffic they sent. The connection limit is enforced against it.

use std::collections::HashMap;

/// Information about an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo<I> {
    /// When the connection was accepted
    pub accepted_at: I,
    /// Frames received so far, including undecodable ones
    pub frames_received: u64,
}

impl<I> ConnectionInfo<I> {
    /// Create info for a freshly accepted connection.
    pub fn new(accepted_at: I) -> Self {
        Self { accepted_at, frames_received: 0 }
    }
}

/// Registry of open connections keyed by session ID.
#[derive(Debug)]
pub struct ConnectionRegistry<I> {
    /// Session ID → connection info
    sessions: HashMap<u64, ConnectionInfo<I>>,
}

impl<I> Default for ConnectionRegistry<I> {
    fn default() -> Self {
        Self { sessions: HashMap::new() }
    }
}

impl<I> ConnectionRegistry<I> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session ID is already registered.
    pub fn register_session(&mut self, session_id: u64, info: ConnectionInfo<I>) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }

        self.sessions.insert(session_id, info);
        true
    }

    /// Remove a session, returning its info.
    pub fn unregister_session(&mut self, session_id: u64) -> Option<ConnectionInfo<I>> {
        self.sessions.remove(&session_id)
    }

    /// Count a received frame. Returns `false` for unknown sessions.
    pub fn record_frame(&mut self, session_id: u64) -> bool {
        match self.sessions.get_mut(&session_id) {
            Some(info) => {
                info.frames_received += 1;
                true
            },
            None => false,
        }
    }

    /// Info for a session.
    pub fn session(&self, session_id: u64) -> Option<&ConnectionInfo<I>> {
        self.sessions.get(&session_id)
    }

    /// Whether a session is registered.
    pub fn contains(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// All open session IDs, in no particular order.
    pub fn session_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.sessions.keys().copied()
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.register_session(1, ConnectionInfo::new(10u64)));
        assert!(registry.contains(1));
        assert_eq!(registry.len(), 1);

        let info = registry.unregister_session(1).unwrap();
        assert_eq!(info.accepted_at, 10);
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_session_id_rejected() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.register_session(7, ConnectionInfo::new(0u64)));
        assert!(!registry.register_session(7, ConnectionInfo::new(5u64)));

        // Original entry untouched
        assert_eq!(registry.session(7).map(|i| i.accepted_at), Some(0));
    }

    #[test]
    fn record_frame_counts_known_sessions_only() {
        let mut registry = ConnectionRegistry::new();
        registry.register_session(1, ConnectionInfo::new(0u64));

        assert!(registry.record_frame(1));
        assert!(registry.record_frame(1));
        assert!(!registry.record_frame(2));

        assert_eq!(registry.session(1).map(|i| i.frames_received), Some(2));
    }

    #[test]
    fn unregister_unknown_is_none() {
        let mut registry: ConnectionRegistry<u64> = ConnectionRegistry::new();
        assert!(registry.unregister_session(99).is_none());
    }
}
