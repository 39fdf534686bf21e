//! Single-task action executor.
//!
//! Every connection task forwards what it sees as [`Inbound`] messages on one
//! unbounded channel. The executor owns the [`ServerDriver`] and the
//! [`Broadcaster`], handles one message to completion, then takes the next.
//! State is never shared across tasks, so nothing is locked.
//!
//! The executor also assigns session IDs. A connection task learns its ID
//! from the `Opened` handshake, so two live connections never share one.
//!
//! ```text
//!  conn task ──┐                                  ┌──▶ writer task (conn A)
//!  conn task ──┼──▶ Inbound ──▶ Executor ──▶ Outbound ──▶ writer task (conn B)
//!  conn task ──┘                                  └──▶ writer task (conn C)
//! ```

use spinwheel_core::{Environment, LogLevel};
use spinwheel_proto::Frame;
use tokio::{
    io::AsyncWrite,
    sync::{mpsc, oneshot},
};

use crate::{
    broadcaster::{Broadcaster, Outbound, OutboundReceiver, OutboundSender},
    codec::write_frame,
    driver::{ServerAction, ServerDriver, ServerEvent},
    error::ServerError,
};

/// Messages from connection tasks to the executor.
#[derive(Debug)]
pub enum Inbound {
    /// A connection finished its handshake and has an outbound queue
    Opened {
        /// Queue drained by the connection's writer task
        outbound: OutboundSender,
        /// Receives the session ID assigned to the connection
        assigned: oneshot::Sender<u64>,
    },

    /// A complete frame arrived
    Received {
        /// Connection that sent the frame
        session_id: u64,
        /// The received frame
        frame: Frame,
    },

    /// The connection is gone
    Closed {
        /// Connection that closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Sending half of the executor's inbound channel.
pub type InboundSender = mpsc::UnboundedSender<Inbound>;

/// Owns the driver and all outbound queues.
pub struct Executor<E>
where
    E: Environment,
{
    driver: ServerDriver<E>,
    broadcaster: Broadcaster,
}

impl<E> Executor<E>
where
    E: Environment,
{
    /// Create an executor around a driver.
    pub fn new(driver: ServerDriver<E>) -> Self {
        Self { driver, broadcaster: Broadcaster::new() }
    }

    /// Spawn the executor on the current runtime and return its inbox.
    pub fn spawn(self) -> InboundSender {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(rx));
        tx
    }

    /// Process inbound messages until every sender is dropped.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(inbound) = inbox.recv().await {
            self.handle(inbound);
        }

        tracing::info!("executor stopped, {} connections open", self.broadcaster.len());
    }

    /// Handle one inbound message to completion.
    pub fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Opened { outbound, assigned } => self.handle_opened(outbound, assigned),
            Inbound::Received { session_id, frame } => {
                self.dispatch(ServerEvent::FrameReceived { session_id, frame });
            },
            Inbound::Closed { session_id, reason } => {
                if !self.driver.has_connection(session_id) {
                    tracing::debug!(session_id, %reason, "close for unaccepted connection ignored");
                    return;
                }
                // Drop the queue first so teardown broadcasts skip the dead peer
                self.broadcaster.unsubscribe(session_id);
                self.dispatch(ServerEvent::ConnectionClosed { session_id, reason });
            },
        }
    }

    fn handle_opened(&mut self, outbound: OutboundSender, assigned: oneshot::Sender<u64>) {
        let session_id = self.unused_session_id();
        if assigned.send(session_id).is_err() {
            tracing::debug!(session_id, "connection task gone before its id was assigned");
            return;
        }

        let subscribed = self.broadcaster.subscribe(session_id, outbound);
        debug_assert!(subscribed, "unused session id must not have a subscriber");

        if let Err(e) = self.dispatch_checked(ServerEvent::ConnectionAccepted { session_id }) {
            tracing::warn!(session_id, error = %e, "connection rejected");
            if let Err(e) = self.broadcaster.close(session_id, e.to_string()) {
                tracing::debug!(session_id, error = %e, "close after rejection failed");
            }
        }
    }

    /// Draw a random ID that no open or closing connection holds.
    fn unused_session_id(&self) -> u64 {
        loop {
            let session_id = self.driver.env().random_u64();
            if !self.broadcaster.contains(session_id) && !self.driver.has_connection(session_id) {
                return session_id;
            }
        }
    }

    fn dispatch(&mut self, event: ServerEvent) {
        if let Err(e) = self.dispatch_checked(event) {
            tracing::debug!(error = %e, "event dropped");
        }
    }

    fn dispatch_checked(&mut self, event: ServerEvent) -> Result<(), ServerError> {
        let actions = self.driver.process_event(event)?;
        self.execute_actions(actions);
        Ok(())
    }

    /// Execute server actions.
    fn execute_actions(&mut self, actions: Vec<ServerAction<E::Instant>>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, frame } => {
                    if let Err(e) = self.broadcaster.send_to(session_id, frame) {
                        tracing::debug!(session_id, error = %e, "SendToSession failed");
                    }
                },

                ServerAction::Broadcast { frame } => {
                    for e in self.broadcaster.publish(&frame) {
                        tracing::debug!(error = %e, "Broadcast failed");
                    }
                },

                ServerAction::CloseConnection { session_id, reason } => {
                    tracing::info!("Closing connection {}: {}", session_id, reason);
                    if let Err(e) = self.broadcaster.close(session_id, reason) {
                        tracing::debug!(session_id, error = %e, "CloseConnection failed");
                    }
                },

                ServerAction::Log { level, message, .. } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }
    }

    /// The driver, for inspection in tests.
    pub fn driver(&self) -> &ServerDriver<E> {
        &self.driver
    }

    /// Number of connections with an outbound queue.
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.len()
    }
}

/// Drain a connection's outbound queue into a byte stream.
///
/// Returns the close reason if the executor asked for a close, or `None` if
/// the queue was dropped.
///
/// A frame too large to encode is logged and skipped.
///
/// # Errors
///
/// - `ServerError::Transport` if the stream fails; remaining items are lost
pub async fn drain_outbound<W>(
    writer: &mut W,
    mut outbound: OutboundReceiver,
) -> Result<Option<String>, ServerError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            // Encoding runs before any byte is written, so the stream stays
            // delimited and later frames still go out
            Outbound::Frame(frame) => match write_frame(writer, &frame).await {
                Ok(()) => {},
                Err(ServerError::Protocol(msg)) => {
                    tracing::warn!("skipping unencodable outbound frame: {}", msg);
                },
                Err(e) => return Err(e),
            },
            Outbound::Close { reason } => return Ok(Some(reason)),
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use spinwheel_proto::{ClientMessage, FrameHeader, ParticipantEntry, ServerMessage};

    use super::*;
    use crate::{codec::read_frame, driver::ServerConfig, system_env::SystemEnv};

    fn executor() -> Executor<SystemEnv> {
        Executor::new(ServerDriver::new(SystemEnv::new(), ServerConfig::default()))
    }

    fn open(executor: &mut Executor<SystemEnv>) -> (u64, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (assigned_tx, mut assigned_rx) = oneshot::channel();
        executor.handle(Inbound::Opened { outbound: tx, assigned: assigned_tx });
        (assigned_rx.try_recv().unwrap(), rx)
    }

    fn send(executor: &mut Executor<SystemEnv>, session_id: u64, message: &ClientMessage) {
        executor.handle(Inbound::Received { session_id, frame: message.to_frame().unwrap() });
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Outbound::Frame(frame)) = rx.try_recv() {
            messages.push(ServerMessage::from_frame(&frame).unwrap());
        }
        messages
    }

    #[test]
    fn opened_connection_gets_initial_state() {
        let mut executor = executor();
        let (session_id, mut rx) = open(&mut executor);

        assert_eq!(drain(&mut rx), vec![ServerMessage::InitialState { participants: vec![] }]);
        assert!(executor.driver().has_connection(session_id));
    }

    #[test]
    fn opened_connections_get_distinct_ids() {
        let mut executor = executor();
        let ids: std::collections::BTreeSet<u64> =
            (0..64).map(|_| open(&mut executor).0).collect();

        assert_eq!(ids.len(), 64);
        assert_eq!(executor.subscriber_count(), 64);
    }

    #[test]
    fn broadcast_reaches_unauthenticated_connections() {
        let mut executor = executor();
        let (alice_id, mut alice) = open(&mut executor);
        let (_, mut watcher) = open(&mut executor);
        drain(&mut alice);
        drain(&mut watcher);

        send(&mut executor, alice_id, &ClientMessage::UserJoin(ParticipantEntry::new(0, "alice")));

        let seen = drain(&mut watcher);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ServerMessage::ClientUpdateJoin(ParticipantEntry::new(0, "alice")));
    }

    #[test]
    fn closed_connection_leaves_roster_for_others() {
        let mut executor = executor();
        let (alice_id, _alice) = open(&mut executor);
        let (_, mut bob) = open(&mut executor);
        send(&mut executor, alice_id, &ClientMessage::Login { username: "alice".into(), role: None });
        send(&mut executor, alice_id, &ClientMessage::UserJoin(ParticipantEntry::new(0, "alice")));
        drain(&mut bob);

        executor.handle(Inbound::Closed { session_id: alice_id, reason: "gone".into() });

        assert_eq!(drain(&mut bob), vec![ServerMessage::ParticipantUpdate(vec![])]);
        assert_eq!(executor.subscriber_count(), 1);
    }

    #[test]
    fn over_limit_connection_is_closed() {
        let driver = ServerDriver::new(SystemEnv::new(), ServerConfig {
            max_connections: 1,
            ..Default::default()
        });
        let mut executor = Executor::new(driver);
        let (first_id, _first) = open(&mut executor);
        let (second_id, mut second) = open(&mut executor);

        assert_eq!(second.try_recv().unwrap(), Outbound::Close {
            reason: "max connections exceeded".to_string()
        });
        assert_eq!(executor.subscriber_count(), 1);

        // The rejected task still reports its close; the first connection stays
        executor.handle(Inbound::Closed { session_id: second_id, reason: "closed".into() });
        assert!(executor.driver().has_connection(first_id));
        assert_eq!(executor.subscriber_count(), 1);
    }

    #[test]
    fn close_for_unknown_session_leaves_others_alone() {
        let mut executor = executor();
        let (alice_id, _alice) = open(&mut executor);
        send(&mut executor, alice_id, &ClientMessage::Login { username: "alice".into(), role: None });
        send(&mut executor, alice_id, &ClientMessage::UserJoin(ParticipantEntry::new(0, "alice")));

        executor.handle(Inbound::Closed { session_id: alice_id.wrapping_add(1), reason: "x".into() });

        assert!(executor.driver().has_connection(alice_id));
        assert_eq!(executor.subscriber_count(), 1);
        let state = executor.driver().engine().state();
        assert_eq!(state.registry().holder("alice"), Some(alice_id));
        assert_eq!(state.roster().len(), 1);
    }

    #[test]
    fn task_gone_before_assignment_is_not_registered() {
        let mut executor = executor();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (assigned, assigned_rx) = oneshot::channel();
        drop(assigned_rx);

        executor.handle(Inbound::Opened { outbound: tx, assigned });

        assert_eq!(executor.subscriber_count(), 0);
        assert_eq!(executor.driver().connection_count(), 0);
    }

    #[test]
    fn oversized_join_never_reaches_watchers() {
        let mut executor = executor();
        let (_, mut watcher) = open(&mut executor);
        let (sender_id, _sender) = open(&mut executor);
        drain(&mut watcher);

        for name in ["x".repeat(40_000), "y".repeat(40_001)] {
            send(&mut executor, sender_id, &ClientMessage::UserJoin(ParticipantEntry::new(0, name)));
        }
        send(&mut executor, sender_id, &ClientMessage::UserJoin(ParticipantEntry::new(1, "alice")));

        assert_eq!(drain(&mut watcher), vec![
            ServerMessage::ClientUpdateJoin(ParticipantEntry::new(1, "alice")),
            ServerMessage::ParticipantUpdate(vec![ParticipantEntry::new(1, "alice")]),
        ]);
    }

    #[tokio::test]
    async fn drain_outbound_writes_frames_until_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut client, mut server) = tokio::io::duplex(4096);
        let frame = ServerMessage::ClientStopWheel("alice".into()).to_frame().unwrap();

        tx.send(Outbound::Frame(frame.clone())).unwrap();
        tx.send(Outbound::Close { reason: "done".into() }).unwrap();

        let reason = drain_outbound(&mut server, rx).await.unwrap();
        assert_eq!(reason, Some("done".to_string()));
        assert_eq!(read_frame(&mut client).await.unwrap(), Some(frame));
    }

    #[tokio::test]
    async fn drain_outbound_skips_oversized_frames() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut client, mut server) = tokio::io::duplex(4096);
        let oversized = Frame::new(vec![0u8; FrameHeader::MAX_PAYLOAD_SIZE as usize + 1]);
        let frame = ServerMessage::ClientStopWheel("alice".into()).to_frame().unwrap();

        tx.send(Outbound::Frame(oversized)).unwrap();
        tx.send(Outbound::Frame(frame.clone())).unwrap();
        drop(tx);

        assert_eq!(drain_outbound(&mut server, rx).await.unwrap(), None);
        assert_eq!(read_frame(&mut client).await.unwrap(), Some(frame));
    }
}
