//! Simulated client for turmoil tests.
//!
//! Speaks the same framing as production clients over a turmoil TCP stream.
//! Every receive is bounded by a timeout so a missing notification fails the
//! test instead of hanging the simulation.

use std::{io, time::Duration};

use spinwheel_proto::{ClientMessage, ParticipantEntry, ServerMessage};
use spinwheel_server::codec;
use turmoil::net::TcpStream;

/// How long a client waits for an expected notification.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test client connected to a [`SimServer`](crate::SimServer).
pub struct SimClient {
    stream: TcpStream,
    initial: Vec<ParticipantEntry>,
}

impl SimClient {
    /// Connect and consume the `initial_state` greeting.
    pub async fn connect(address: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let mut client = Self { stream, initial: Vec::new() };

        match client.recv().await? {
            ServerMessage::InitialState { participants } => client.initial = participants,
            other => {
                return Err(io::Error::other(format!(
                    "expected initial_state, got {}",
                    other.event_name()
                )));
            },
        }

        Ok(client)
    }

    /// Roster received when the connection was opened.
    pub fn initial_participants(&self) -> &[ParticipantEntry] {
        &self.initial
    }

    /// Send one client event.
    pub async fn send(&mut self, message: &ClientMessage) -> io::Result<()> {
        let frame = message.to_frame().map_err(io::Error::other)?;
        codec::write_frame(&mut self.stream, &frame).await.map_err(io::Error::other)
    }

    /// Receive the next notification.
    pub async fn recv(&mut self) -> io::Result<ServerMessage> {
        let read = codec::read_frame(&mut self.stream);
        let frame = tokio::time::timeout(RECV_TIMEOUT, read)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no notification"))?
            .map_err(io::Error::other)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "server closed"))?;

        ServerMessage::from_frame(&frame).map_err(io::Error::other)
    }

    /// Skip notifications until one matches.
    pub async fn recv_until<F>(&mut self, mut matches: F) -> io::Result<ServerMessage>
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let message = self.recv().await?;
            if matches(&message) {
                return Ok(message);
            }
        }
    }

    /// Log in and wait for the outcome. Returns `(success, message)`.
    pub async fn login(&mut self, username: &str) -> io::Result<(bool, String)> {
        self.send(&ClientMessage::Login { username: username.to_string(), role: None }).await?;

        loop {
            if let ServerMessage::LoginStatus { success, message } = self.recv().await? {
                return Ok((success, message));
            }
        }
    }

    /// Assert nothing arrives for `duration`.
    ///
    /// Returns an error carrying the event name if a notification shows up.
    pub async fn expect_silence(&mut self, duration: Duration) -> io::Result<()> {
        match tokio::time::timeout(duration, codec::read_frame(&mut self.stream)).await {
            Err(_) => Ok(()),
            Ok(Ok(Some(frame))) => {
                let name = ServerMessage::from_frame(&frame)
                    .map(|m| m.event_name())
                    .unwrap_or("undecodable frame");
                Err(io::Error::other(format!("unexpected notification: {name}")))
            },
            Ok(Ok(None)) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "server closed")),
            Ok(Err(e)) => Err(io::Error::other(e)),
        }
    }
}
