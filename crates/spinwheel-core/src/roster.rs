//! Participant roster for the current wheel round.
//!
//! Entries keep arrival order and are unique by username. The client-chosen
//! `index` is opaque here: duplicates and gaps are allowed.

use spinwheel_proto::ParticipantEntry;

/// Result of [`ParticipantRoster::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Entry appended
    Joined,
    /// Username already queued; roster unchanged
    AlreadyPresent,
}

/// Result of [`ParticipantRoster::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Entry removed
    Removed(ParticipantEntry),
    /// Username was not queued
    NotPresent,
}

impl CancelOutcome {
    /// Whether an entry was removed.
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

/// Ordered, username-unique queue of participants.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRoster {
    entries: Vec<ParticipantEntry>,
}

impl ParticipantRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless its username is already queued.
    pub fn join(&mut self, entry: ParticipantEntry) -> JoinOutcome {
        if self.contains(&entry.username) {
            return JoinOutcome::AlreadyPresent;
        }

        self.entries.push(entry);
        JoinOutcome::Joined
    }

    /// Remove the entry for `username`, preserving the order of the rest.
    pub fn cancel(&mut self, username: &str) -> CancelOutcome {
        match self.entries.iter().position(|e| e.username == username) {
            Some(pos) => CancelOutcome::Removed(self.entries.remove(pos)),
            None => CancelOutcome::NotPresent,
        }
    }

    /// Clear the roster. Returns how many entries were dropped.
    pub fn reset_round(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }

    /// Owned copy of the roster in arrival order.
    pub fn snapshot(&self) -> Vec<ParticipantEntry> {
        self.entries.clone()
    }

    /// Entries in arrival order.
    pub fn entries(&self) -> &[ParticipantEntry] {
        &self.entries
    }

    /// Whether `username` is queued.
    pub fn contains(&self, username: &str) -> bool {
        self.entries.iter().any(|e| e.username == username)
    }

    /// Number of queued participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
