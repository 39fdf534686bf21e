//! Join/win ledger for the admin's stats window.
//!
//! The ledger only records while the admin is online. Activation and reset
//! are driven exclusively by [`AdminPresence`](crate::AdminPresence), which
//! guarantees the ledger is empty whenever it is inactive.

use spinwheel_proto::{StatsRecord, StatsSnapshot};

/// Result of [`StatsLedger::record_win`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinOutcome {
    /// Winner had a record; its win count was incremented
    Recorded(StatsRecord),
    /// Winner never joined during this window; dropped
    UnknownWinner,
    /// Admin offline; nothing recorded
    Inactive,
}

/// Per-username join/win counters.
#[derive(Debug, Clone, Default)]
pub struct StatsLedger {
    active: bool,
    records: StatsSnapshot,
}

impl StatsLedger {
    /// Create an inactive, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether writes are currently recorded.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Count a join. Creates a zeroed record on first use.
    ///
    /// Returns the updated record, or `None` while inactive.
    pub fn record_join(&mut self, username: &str) -> Option<StatsRecord> {
        if !self.active {
            return None;
        }

        let record = self.records.entry(username.to_string()).or_default();
        record.join_count += 1;
        Some(*record)
    }

    /// Undo a join after a cancellation. Clamps at zero.
    ///
    /// Returns the updated record, or `None` while inactive or when the
    /// username has no record.
    pub fn record_cancel_undo(&mut self, username: &str) -> Option<StatsRecord> {
        if !self.active {
            return None;
        }

        let record = self.records.get_mut(username)?;
        record.join_count = record.join_count.saturating_sub(1);
        Some(*record)
    }

    /// Count a win for a username that already has a record.
    pub fn record_win(&mut self, username: &str) -> WinOutcome {
        if !self.active {
            return WinOutcome::Inactive;
        }

        match self.records.get_mut(username) {
            Some(record) => {
                record.win_count += 1;
                WinOutcome::Recorded(*record)
            },
            None => WinOutcome::UnknownWinner,
        }
    }

    /// Counters for one username.
    pub fn get(&self, username: &str) -> Option<StatsRecord> {
        self.records.get(username).copied()
    }

    /// Owned copy of all counters, ordered by username.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.records.clone()
    }

    /// Number of tracked usernames.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no username is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record.
    pub(crate) fn reset(&mut self) {
        self.records.clear();
    }

    /// Mirror the admin presence state.
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_ledger() -> StatsLedger {
        let mut ledger = StatsLedger::new();
        ledger.set_active(true);
        ledger
    }

    #[test]
    fn inactive_ledger_records_nothing() {
        let mut ledger = StatsLedger::new();

        assert_eq!(ledger.record_join("alice"), None);
        assert_eq!(ledger.record_win("alice"), WinOutcome::Inactive);
        assert_eq!(ledger.record_cancel_undo("alice"), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn join_creates_record_lazily() {
        let mut ledger = active_ledger();

        assert_eq!(ledger.record_join("alice"), Some(StatsRecord { join_count: 1, win_count: 0 }));
        assert_eq!(ledger.record_join("alice"), Some(StatsRecord { join_count: 2, win_count: 0 }));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn cancel_undo_clamps_at_zero() {
        let mut ledger = active_ledger();
        ledger.record_join("alice");

        assert_eq!(ledger.record_cancel_undo("alice").map(|r| r.join_count), Some(0));
        assert_eq!(ledger.record_cancel_undo("alice").map(|r| r.join_count), Some(0));
    }

    #[test]
    fn cancel_undo_does_not_create_record() {
        let mut ledger = active_ledger();

        assert_eq!(ledger.record_cancel_undo("ghost"), None);
        assert!(ledger.get("ghost").is_none());
    }

    #[test]
    fn win_requires_existing_record() {
        let mut ledger = active_ledger();

        assert_eq!(ledger.record_win("ghost"), WinOutcome::UnknownWinner);
        assert!(ledger.is_empty());

        ledger.record_join("alice");
        assert_eq!(
            ledger.record_win("alice"),
            WinOutcome::Recorded(StatsRecord { join_count: 1, win_count: 1 })
        );
    }

    #[test]
    fn win_survives_cancel_undo_to_zero() {
        let mut ledger = active_ledger();
        ledger.record_join("alice");
        ledger.record_cancel_undo("alice");

        // Record still exists at join_count 0, so the win counts
        assert!(matches!(ledger.record_win("alice"), WinOutcome::Recorded(_)));
    }

    #[test]
    fn reset_empties_records() {
        let mut ledger = active_ledger();
        ledger.record_join("alice");
        ledger.record_join("bob");

        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.is_active());
    }
}
