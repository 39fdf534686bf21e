//! Session engine.
//!
//! Takes decoded client events and returns [`EngineAction`]s. Each event is
//! handled to completion: authorize, mutate [`SessionState`], then emit
//! replies and broadcasts in the order clients should observe them.
//!
//! The engine never performs I/O and never fails. Rejections become either a
//! targeted `login_status` reply or a `Debug` log action.

use std::fmt;

use spinwheel_proto::{CancelRequest, ClientMessage, ParticipantEntry, ServerMessage};

use crate::{
    error::SessionError,
    roster::{CancelOutcome, JoinOutcome},
    session::{AuthenticatedSession, SessionState},
    stats::WinOutcome,
};

/// Reply text for a successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "login successful";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Reserved display name with admin rights
    pub admin_name: String,
    /// Longest accepted display name, in characters
    pub max_username_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { admin_name: "backy".to_string(), max_username_len: 64 }
    }
}

/// Log levels for engine and driver actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Actions produced by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction<I> {
    /// Send a message to one connection
    Reply {
        /// Target session ID
        session_id: u64,
        /// Message to send
        message: ServerMessage,
    },

    /// Send a message to every live connection
    Broadcast {
        /// Message to send
        message: ServerMessage,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Action-based session engine.
///
/// Owns the only [`SessionState`]. Callers must feed events one at a time;
/// the engine relies on that for its invariants instead of locking.
#[derive(Debug, Clone)]
pub struct SessionEngine<I> {
    config: EngineConfig,
    state: SessionState<I>,
}

impl<I: Copy + fmt::Debug> SessionEngine<I> {
    /// Create an engine with empty state.
    pub fn new(config: EngineConfig) -> Self {
        let state = SessionState::new(config.admin_name.clone());
        Self { config, state }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the session state.
    pub fn state(&self) -> &SessionState<I> {
        &self.state
    }

    /// A transport connection was opened. Replies with the current roster.
    pub fn connect(&mut self, session_id: u64, now: I) -> Vec<EngineAction<I>> {
        vec![
            EngineAction::Reply {
                session_id,
                message: ServerMessage::InitialState { participants: self.state.roster.snapshot() },
            },
            EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[connect] session {session_id}"),
                timestamp: now,
            },
        ]
    }

    /// A transport connection closed. Tears down its identity, if any.
    pub fn disconnect(&mut self, session_id: u64, now: I) -> Vec<EngineAction<I>> {
        let mut actions = Vec::new();

        if !self.release(session_id, now, &mut actions) {
            actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[disconnect] session {session_id} had no live identity"),
                timestamp: now,
            });
        }

        actions
    }

    /// Handle one client event from `session_id`.
    pub fn handle(
        &mut self,
        session_id: u64,
        message: ClientMessage,
        now: I,
    ) -> Vec<EngineAction<I>> {
        if message.is_admin_action() {
            if let Err(err) = self.authorize(session_id, message.event_name()) {
                return vec![EngineAction::Log {
                    level: LogLevel::Debug,
                    message: format!("[denied] session {session_id}: {err}"),
                    timestamp: now,
                }];
            }
        }

        match message {
            ClientMessage::Login { username, role } => {
                self.handle_login(session_id, username, role.as_deref(), now)
            },
            ClientMessage::Logout => self.handle_logout(session_id, now),
            ClientMessage::UserJoin(entry) => self.handle_join(session_id, entry, now),
            ClientMessage::UserCancel(request) => self.handle_cancel(session_id, request, now),
            ClientMessage::AdminManualJoin(entry) => self.handle_join(session_id, entry, now),
            ClientMessage::AdminManualCancel(request) => {
                self.handle_cancel(session_id, request, now)
            },
            ClientMessage::AdminStartWheel => vec![EngineAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "[spin] admin started the wheel with {} participants",
                    self.state.roster.len()
                ),
                timestamp: now,
            }],
            ClientMessage::AdminStopWheel(winner) => self.handle_stop_wheel(winner, now),
            ClientMessage::AdminResetParticipants => self.handle_reset(now),
            ClientMessage::AdminRequestStats => vec![EngineAction::Reply {
                session_id,
                message: ServerMessage::StatsData(self.state.ledger.snapshot()),
            }],
        }
    }

    /// Single authorization guard for admin-only events.
    ///
    /// Attached sessions are always the registry holder of their name, so the
    /// resolved role is enough.
    fn authorize(&self, session_id: u64, action: &'static str) -> Result<(), SessionError> {
        match self.state.sessions.get(&session_id) {
            Some(session) if session.role.is_admin() => {
                debug_assert_eq!(
                    self.state.registry.holder(&session.username),
                    Some(session_id),
                    "attached admin session must hold the admin binding"
                );
                Ok(())
            },
            _ => Err(SessionError::Unauthorized { action }),
        }
    }

    fn handle_login(
        &mut self,
        session_id: u64,
        username: String,
        claimed_role: Option<&str>,
        now: I,
    ) -> Vec<EngineAction<I>> {
        let mut actions = Vec::new();

        if let Some(claimed) = claimed_role {
            if claimed.eq_ignore_ascii_case("admin") && username != self.config.admin_name {
                actions.push(EngineAction::Log {
                    level: LogLevel::Debug,
                    message: format!("[login] ignoring claimed admin role for {username}"),
                    timestamp: now,
                });
            }
        }

        let message = match self.try_login(session_id, &username, now, &mut actions) {
            Ok(()) => ServerMessage::LoginStatus {
                success: true,
                message: LOGIN_SUCCESS_MESSAGE.to_string(),
            },
            Err(err) => {
                actions.push(EngineAction::Log {
                    level: LogLevel::Warn,
                    message: format!("[login] rejected for session {session_id}: {err}"),
                    timestamp: now,
                });
                ServerMessage::LoginStatus { success: false, message: err.to_string() }
            },
        };

        actions.push(EngineAction::Reply { session_id, message });
        actions
    }

    fn try_login(
        &mut self,
        session_id: u64,
        username: &str,
        now: I,
        actions: &mut Vec<EngineAction<I>>,
    ) -> Result<(), SessionError> {
        self.validate_username(username)?;

        let current = self.state.sessions.get(&session_id).map(|s| s.username.clone());
        match current {
            Some(current) if current == username => {
                // Same identity again; admin still gets a fresh stats window
                if self.state.registry.role_of(username).is_admin() {
                    self.admin_online(now, actions);
                }
                return Ok(());
            },
            Some(_) => {
                if let Some(holder) = self.conflicting_holder(username, session_id) {
                    return Err(SessionError::LoginConflict {
                        username: username.to_string(),
                        holder,
                    });
                }
                self.release(session_id, now, actions);
            },
            None => {},
        }

        let replaced = self.state.registry.bind(username, session_id)?;
        if let Some(previous) = replaced {
            self.state.sessions.remove(&previous);
            actions.push(EngineAction::Log {
                level: LogLevel::Info,
                message: format!("[login] admin session {previous} superseded by {session_id}"),
                timestamp: now,
            });
        }

        let role = self.state.registry.role_of(username);
        self.state.sessions.insert(session_id, AuthenticatedSession {
            username: username.to_string(),
            role,
            since: now,
        });

        actions.push(EngineAction::Log {
            level: LogLevel::Info,
            message: format!("[login] {username} on session {session_id}"),
            timestamp: now,
        });

        if role.is_admin() {
            self.admin_online(now, actions);
        }
        self.log_online(now, actions);

        Ok(())
    }

    fn validate_username(&self, username: &str) -> Result<(), SessionError> {
        if username.trim().is_empty() {
            return Err(SessionError::InvalidUsername { reason: "name is empty".to_string() });
        }

        let len = username.chars().count();
        if len > self.config.max_username_len {
            return Err(SessionError::InvalidUsername {
                reason: format!(
                    "name is {len} characters, limit is {}",
                    self.config.max_username_len
                ),
            });
        }

        Ok(())
    }

    fn conflicting_holder(&self, username: &str, session_id: u64) -> Option<u64> {
        if self.state.registry.would_conflict(username, session_id) {
            self.state.registry.holder(username)
        } else {
            None
        }
    }

    fn handle_logout(&mut self, session_id: u64, now: I) -> Vec<EngineAction<I>> {
        let mut actions = Vec::new();

        if !self.release(session_id, now, &mut actions) {
            actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[logout] session {session_id} is not logged in"),
                timestamp: now,
            });
        }

        actions
    }

    /// Teardown shared by logout, disconnect and rename.
    ///
    /// Returns `false` if the session had no live identity.
    fn release(&mut self, session_id: u64, now: I, actions: &mut Vec<EngineAction<I>>) -> bool {
        let Some(session) = self.state.sessions.remove(&session_id) else {
            return false;
        };

        if !self.state.registry.unbind(&session.username, session_id) {
            actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!(
                    "[logout] stale binding for {} on session {session_id}",
                    session.username
                ),
                timestamp: now,
            });
            return false;
        }

        actions.push(EngineAction::Log {
            level: LogLevel::Info,
            message: format!(
                "[logout] {} left session {session_id}, logged in since {:?}",
                session.username, session.since
            ),
            timestamp: now,
        });

        self.state.roster.cancel(&session.username);
        actions.push(EngineAction::Broadcast {
            message: ServerMessage::ParticipantUpdate(self.state.roster.snapshot()),
        });

        if session.role.is_admin() && self.state.presence.logout(&mut self.state.ledger).is_some()
        {
            actions.push(EngineAction::Log {
                level: LogLevel::Info,
                message: "[admin] offline, stats cleared".to_string(),
                timestamp: now,
            });
        }

        self.log_online(now, actions);
        true
    }

    fn handle_join(
        &mut self,
        session_id: u64,
        entry: ParticipantEntry,
        now: I,
    ) -> Vec<EngineAction<I>> {
        if let Err(err) = self.validate_username(&entry.username) {
            return vec![EngineAction::Log {
                level: LogLevel::Warn,
                message: format!("[join] dropped entry from {session_id}: {err}"),
                timestamp: now,
            }];
        }

        match self.state.roster.join(entry.clone()) {
            JoinOutcome::Joined => {
                let mut actions = vec![
                    EngineAction::Broadcast { message: ServerMessage::ClientUpdateJoin(entry.clone()) },
                    EngineAction::Broadcast {
                        message: ServerMessage::ParticipantUpdate(self.state.roster.snapshot()),
                    },
                    EngineAction::Log {
                        level: LogLevel::Info,
                        message: format!("[join] {} (index {})", entry.username, entry.index),
                        timestamp: now,
                    },
                ];

                if let Some(record) = self.state.ledger.record_join(&entry.username) {
                    actions.push(EngineAction::Log {
                        level: LogLevel::Debug,
                        message: format!("[stats] {} joins={}", entry.username, record.join_count),
                        timestamp: now,
                    });
                }

                actions
            },
            JoinOutcome::AlreadyPresent => vec![EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[join] {} already queued", entry.username),
                timestamp: now,
            }],
        }
    }

    fn handle_cancel(
        &mut self,
        session_id: u64,
        request: CancelRequest,
        now: I,
    ) -> Vec<EngineAction<I>> {
        let outcome = self.state.roster.cancel(&request.username);
        let mut actions = Vec::new();

        if let CancelOutcome::Removed(_) = outcome {
            actions.push(EngineAction::Log {
                level: LogLevel::Info,
                message: format!("[cancel] {} (by session {session_id})", request.username),
                timestamp: now,
            });
            if let Some(record) = self.state.ledger.record_cancel_undo(&request.username) {
                actions.push(EngineAction::Log {
                    level: LogLevel::Debug,
                    message: format!("[stats] {} joins={}", request.username, record.join_count),
                    timestamp: now,
                });
            }
        } else {
            actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[cancel] {} was not queued", request.username),
                timestamp: now,
            });
        }

        // Clients expect the notice even when nothing was removed
        actions.push(EngineAction::Broadcast { message: ServerMessage::ClientUpdateCancel(request) });
        actions.push(EngineAction::Broadcast {
            message: ServerMessage::ParticipantUpdate(self.state.roster.snapshot()),
        });

        actions
    }

    fn handle_stop_wheel(&mut self, winner: String, now: I) -> Vec<EngineAction<I>> {
        let cleared = self.state.roster.reset_round();

        let mut actions = vec![
            EngineAction::Broadcast { message: ServerMessage::ClientStopWheel(winner.clone()) },
            EngineAction::Broadcast { message: ServerMessage::ParticipantUpdate(Vec::new()) },
            EngineAction::Log {
                level: LogLevel::Info,
                message: format!("[result] winner {winner}, cleared {cleared} participants"),
                timestamp: now,
            },
        ];

        match self.state.ledger.record_win(&winner) {
            WinOutcome::Recorded(record) => actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[stats] {winner} wins={}", record.win_count),
                timestamp: now,
            }),
            WinOutcome::UnknownWinner => actions.push(EngineAction::Log {
                level: LogLevel::Debug,
                message: format!("[stats] no record for winner {winner}, win dropped"),
                timestamp: now,
            }),
            WinOutcome::Inactive => {},
        }

        actions
    }

    fn handle_reset(&mut self, now: I) -> Vec<EngineAction<I>> {
        let cleared = self.state.roster.reset_round();

        vec![
            EngineAction::Broadcast { message: ServerMessage::ParticipantUpdate(Vec::new()) },
            EngineAction::Log {
                level: LogLevel::Info,
                message: format!("[reset] admin cleared {cleared} participants"),
                timestamp: now,
            },
        ]
    }

    fn admin_online(&mut self, now: I, actions: &mut Vec<EngineAction<I>>) {
        let transition = self.state.presence.login(&mut self.state.ledger);
        actions.push(EngineAction::Log {
            level: LogLevel::Info,
            message: format!(
                "[admin] {:?} -> {:?}, stats window opened",
                transition.from, transition.to
            ),
            timestamp: now,
        });
    }

    fn log_online(&self, now: I, actions: &mut Vec<EngineAction<I>>) {
        let names: Vec<&str> = self.state.registry.online().collect();
        let listing = if names.is_empty() { "none".to_string() } else { names.join(", ") };

        actions.push(EngineAction::Log {
            level: LogLevel::Info,
            message: format!("[online] {}: {listing}", names.len()),
            timestamp: now,
        });
    }
}
