//! Model world: the reference implementation.
//!
//! A deliberately naive re-statement of the session rules using plain maps
//! and vectors. The real driver must agree with it on every operation's
//! outcome and on the observable state afterwards.

use std::collections::BTreeMap;

use super::operation::{ConnId, MODEL_ADMIN, ModelName, Operation, OperationResult};

/// Longest name the model accepts, matching the default engine config.
const MAX_NAME_CHARS: usize = 64;

/// Observable state for oracle comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Logged-in connections and their names.
    pub logged_in: BTreeMap<ConnId, String>,
    /// Roster as `(index, username)` in arrival order.
    pub roster: Vec<(i64, String)>,
    /// Stats window as `username -> (joins, wins)`.
    pub stats: BTreeMap<String, (u64, u64)>,
    /// Whether the admin is online.
    pub admin_online: bool,
}

/// Model world.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    /// Open connections and the name each is logged in as.
    open: BTreeMap<ConnId, Option<String>>,
    /// Name bindings.
    bindings: BTreeMap<String, ConnId>,
    roster: Vec<(i64, String)>,
    stats: BTreeMap<String, (u64, u64)>,
    admin_online: bool,
}

impl ModelWorld {
    /// Create an empty world with no open connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connection is open.
    pub fn is_open(&self, conn: ConnId) -> bool {
        self.open.contains_key(&conn)
    }

    /// Apply an operation and return its outcome.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let conn = op.conn();

        if let Operation::Disconnect { .. } = op {
            if !self.is_open(conn) {
                return OperationResult::NotConnected;
            }
            self.release(conn);
            self.open.remove(&conn);
            return OperationResult::Ok;
        }

        self.open.entry(conn).or_insert(None);

        if op.is_admin_only() && !self.is_admin(conn) {
            return OperationResult::Denied;
        }

        match op {
            Operation::Login { name, .. } => self.login(conn, *name),
            Operation::Logout { .. } => {
                self.release(conn);
                OperationResult::Ok
            },
            Operation::Join { name, index, .. } | Operation::ManualJoin { name, index, .. } => {
                self.join(name.as_string(), i64::from(*index));
                OperationResult::Ok
            },
            Operation::Cancel { name, .. } | Operation::ManualCancel { name, .. } => {
                self.cancel(&name.as_string());
                OperationResult::Ok
            },
            Operation::StopWheel { winner, .. } => {
                self.roster.clear();
                if self.admin_online {
                    if let Some(record) = self.stats.get_mut(&winner.as_string()) {
                        record.1 += 1;
                    }
                }
                OperationResult::Ok
            },
            Operation::Reset { .. } => {
                self.roster.clear();
                OperationResult::Ok
            },
            Operation::RequestStats { .. } => OperationResult::Stats(self.stats.clone()),
            Operation::StartWheel { .. } | Operation::Disconnect { .. } => OperationResult::Ok,
        }
    }

    /// Current observable state.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            logged_in: self
                .open
                .iter()
                .filter_map(|(&conn, name)| name.clone().map(|n| (conn, n)))
                .collect(),
            roster: self.roster.clone(),
            stats: self.stats.clone(),
            admin_online: self.admin_online,
        }
    }

    fn is_admin(&self, conn: ConnId) -> bool {
        self.open.get(&conn).and_then(Option::as_deref) == Some(MODEL_ADMIN)
    }

    fn login(&mut self, conn: ConnId, name: ModelName) -> OperationResult {
        let name = name.as_string();
        if !is_valid_name(&name) {
            return OperationResult::LoginRejected;
        }

        let is_admin = name == MODEL_ADMIN;
        let held_by_other = self.bindings.get(&name).is_some_and(|&holder| holder != conn);

        match self.open.get(&conn).cloned().flatten() {
            Some(current) if current == name => {
                if is_admin {
                    self.open_stats_window();
                }
                return OperationResult::LoginAccepted;
            },
            Some(_) if !is_admin && held_by_other => return OperationResult::LoginRejected,
            Some(_) => self.release(conn),
            None if !is_admin && held_by_other => return OperationResult::LoginRejected,
            None => {},
        }

        if let Some(previous) = self.bindings.insert(name.clone(), conn) {
            if previous != conn {
                self.open.insert(previous, None);
            }
        }
        self.open.insert(conn, Some(name));

        if is_admin {
            self.open_stats_window();
        }
        OperationResult::LoginAccepted
    }

    fn release(&mut self, conn: ConnId) {
        let Some(name) = self.open.get_mut(&conn).and_then(Option::take) else {
            return;
        };

        self.bindings.remove(&name);
        self.roster.retain(|(_, queued)| *queued != name);

        if name == MODEL_ADMIN {
            self.admin_online = false;
            self.stats.clear();
        }
    }

    fn join(&mut self, name: String, index: i64) {
        if !is_valid_name(&name) || self.roster.iter().any(|(_, queued)| *queued == name) {
            return;
        }

        if self.admin_online {
            self.stats.entry(name.clone()).or_default().0 += 1;
        }
        self.roster.push((index, name));
    }

    fn cancel(&mut self, name: &str) {
        let Some(pos) = self.roster.iter().position(|(_, queued)| queued == name) else {
            return;
        };
        self.roster.remove(pos);

        if self.admin_online {
            if let Some(record) = self.stats.get_mut(name) {
                record.0 = record.0.saturating_sub(1);
            }
        }
    }

    fn open_stats_window(&mut self) {
        self.admin_online = true;
        self.stats.clear();
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() <= MAX_NAME_CHARS
}
