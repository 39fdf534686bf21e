//! Server driver.
//!
//! Ties together the connection registry (transport-level bookkeeping) and
//! the session engine (identity, roster, stats). Decodes inbound payloads
//! once at this boundary and encodes outbound messages into frames.

use spinwheel_core::{EngineAction, EngineConfig, Environment, LogLevel, SessionEngine};
use spinwheel_proto::{ClientMessage, Frame};

use crate::{
    registry::{ConnectionInfo, ConnectionRegistry},
    server_error::ServerError,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Session engine configuration (admin name, name limits)
    pub engine: EngineConfig,
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { engine: EngineConfig::default(), max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: u64,
    },

    /// A frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        session_id: u64,
        /// The received frame
        frame: Frame,
    },

    /// A connection was closed (by peer, idle timeout or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone)]
pub enum ServerAction<I> {
    /// Send a frame to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Frame to send
        frame: Frame,
    },

    /// Send a frame to every open connection
    Broadcast {
        /// Frame to broadcast
        frame: Frame,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
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

/// Action-based server driver.
///
/// Orchestrates connection management, payload decoding and the session
/// engine.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Open connections (session_id → info)
    registry: ConnectionRegistry<E::Instant>,
    /// Identity, roster and stats
    engine: SessionEngine<E::Instant>,
    /// Environment (time, RNG)
    env: E,
    /// Server configuration
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            engine: SessionEngine::new(config.engine.clone()),
            env,
            config,
        }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(
        &mut self,
        event: ServerEvent,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame_received(session_id, &frame)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_connection_closed(session_id, &reason)
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        if self.registry.len() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        if !self.registry.register_session(session_id, ConnectionInfo::new(now)) {
            return Err(ServerError::SessionAlreadyExists(session_id));
        }

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!(
                "connection {} accepted, {} open",
                session_id,
                self.registry.len()
            ),
            timestamp: now,
        }];

        let engine_actions = self.engine.connect(session_id, now);
        actions.extend(engine_actions.into_iter().map(|a| self.convert_engine_action(a)));

        Ok(actions)
    }

    /// Handle a frame received from a connection.
    fn handle_frame_received(
        &mut self,
        session_id: u64,
        frame: &Frame,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        if !self.registry.record_frame(session_id) {
            return Err(ServerError::SessionNotFound(session_id));
        }

        let message = match ClientMessage::from_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                return Ok(vec![ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!("dropping undecodable frame from {session_id}: {e}"),
                    timestamp: now,
                }]);
            },
        };

        let engine_actions = self.engine.handle(session_id, message, now);
        Ok(engine_actions.into_iter().map(|a| self.convert_engine_action(a)).collect())
    }

    /// Handle a connection being closed.
    fn handle_connection_closed(
        &mut self,
        session_id: u64,
        reason: &str,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        let info = self
            .registry
            .unregister_session(session_id)
            .ok_or(ServerError::SessionNotFound(session_id))?;

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "connection {} closed: {}, open for {:?}, {} frames",
                session_id,
                reason,
                now - info.accepted_at,
                info.frames_received
            ),
            timestamp: now,
        }];

        let engine_actions = self.engine.disconnect(session_id, now);
        actions.extend(engine_actions.into_iter().map(|a| self.convert_engine_action(a)));

        Ok(actions)
    }

    /// Convert an engine action to a server action, encoding messages.
    fn convert_engine_action(
        &self,
        action: EngineAction<E::Instant>,
    ) -> ServerAction<E::Instant> {
        match action {
            EngineAction::Reply { session_id, message } => match message.to_frame() {
                Ok(frame) => ServerAction::SendToSession { session_id, frame },
                Err(e) => ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!("failed to encode {} for {}: {}", message.event_name(), session_id, e),
                    timestamp: self.env.now(),
                },
            },
            EngineAction::Broadcast { message } => match message.to_frame() {
                Ok(frame) => ServerAction::Broadcast { frame },
                Err(e) => ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!("failed to encode {} broadcast: {}", message.event_name(), e),
                    timestamp: self.env.now(),
                },
            },
            EngineAction::Log { level, message, timestamp } => {
                ServerAction::Log { level, message, timestamp }
            },
        }
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether a connection is open.
    pub fn has_connection(&self, session_id: u64) -> bool {
        self.registry.contains(session_id)
    }

    /// All open session IDs.
    pub fn session_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.registry.session_ids()
    }

    /// The session engine, for inspecting identity, roster and stats.
    pub fn engine(&self) -> &SessionEngine<E::Instant> {
        &self.engine
    }

    /// Environment used for time and session IDs.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Driver configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use spinwheel_proto::{ParticipantEntry, ServerMessage};

    use super::*;

    #[derive(Clone)]
    struct TestEnv {}

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> std::time::Instant {
            std::time::Instant::now()
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            use rand::RngCore;
            rand::thread_rng().fill_bytes(buffer);
        }
    }

    fn frame(message: &ClientMessage) -> Frame {
        message.to_frame().unwrap()
    }

    fn decode(frame: &Frame) -> ServerMessage {
        ServerMessage::from_frame(frame).unwrap()
    }

    #[test]
    fn server_accepts_connection_with_initial_state() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        assert_eq!(server.connection_count(), 1);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Debug, .. }));

        let initial = actions.iter().find_map(|a| match a {
            ServerAction::SendToSession { session_id: 1, frame } => Some(decode(frame)),
            _ => None,
        });
        assert_eq!(initial, Some(ServerMessage::InitialState { participants: vec![] }));
    }

    #[test]
    fn server_rejects_when_max_connections_exceeded() {
        let config = ServerConfig { max_connections: 2, ..Default::default() };
        let mut server = ServerDriver::new(TestEnv {}, config);

        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 2 }).unwrap();

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 3 }).unwrap();

        assert_eq!(server.connection_count(), 2);
        assert!(matches!(actions[0], ServerAction::CloseConnection { session_id: 3, .. }));
    }

    #[test]
    fn server_rejects_duplicate_session_id() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let result = server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 });
        assert_eq!(result.err(), Some(ServerError::SessionAlreadyExists(1)));
    }

    #[test]
    fn server_handles_connection_closed() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());

        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        assert_eq!(server.connection_count(), 1);

        server
            .process_event(ServerEvent::ConnectionClosed {
                session_id: 1,
                reason: "client disconnect".to_string(),
            })
            .unwrap();

        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn frame_from_unknown_session_is_an_error() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());

        let result = server.process_event(ServerEvent::FrameReceived {
            session_id: 9,
            frame: frame(&ClientMessage::Logout),
        });
        assert_eq!(result.err(), Some(ServerError::SessionNotFound(9)));
    }

    #[test]
    fn undecodable_payload_is_logged_and_dropped() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let actions = server
            .process_event(ServerEvent::FrameReceived {
                session_id: 1,
                frame: Frame::new(vec![0xff, 0x00, 0x13]),
            })
            .unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Warn, .. }));
        assert!(server.has_connection(1));
    }

    #[test]
    fn join_becomes_two_broadcasts() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let entry = ParticipantEntry::new(0, "alice");
        let actions = server
            .process_event(ServerEvent::FrameReceived {
                session_id: 1,
                frame: frame(&ClientMessage::UserJoin(entry.clone())),
            })
            .unwrap();

        let broadcasts: Vec<ServerMessage> = actions
            .iter()
            .filter_map(|a| match a {
                ServerAction::Broadcast { frame } => Some(decode(frame)),
                _ => None,
            })
            .collect();

        assert_eq!(broadcasts, vec![
            ServerMessage::ClientUpdateJoin(entry.clone()),
            ServerMessage::ParticipantUpdate(vec![entry]),
        ]);
    }

    #[test]
    fn close_tears_down_engine_identity() {
        let mut server = ServerDriver::new(TestEnv {}, ServerConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        server
            .process_event(ServerEvent::FrameReceived {
                session_id: 1,
                frame: frame(&ClientMessage::Login { username: "alice".into(), role: None }),
            })
            .unwrap();
        assert!(server.engine().state().registry().is_bound("alice"));

        server
            .process_event(ServerEvent::ConnectionClosed {
                session_id: 1,
                reason: "idle timeout".to_string(),
            })
            .unwrap();

        assert!(!server.engine().state().registry().is_bound("alice"));
    }
}
