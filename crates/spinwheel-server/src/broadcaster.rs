//! Subscriber set for outbound delivery.
//!
//! One subscriber per open connection, each an unbounded channel drained by
//! that connection's writer task. Unicast replies go straight to one
//! subscriber; broadcasts publish the same frame to all of them. Neither path
//! waits on the network.

use std::collections::HashMap;

use spinwheel_proto::Frame;
use tokio::sync::mpsc;

use crate::server_error::ExecutorError;

/// Item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write a frame
    Frame(Frame),
    /// Stop writing and close the connection
    Close {
        /// Reason reported to the peer
        reason: String,
    },
}

/// Sending half of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Receiving half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Live subscribers keyed by session ID.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: HashMap<u64, OutboundSender>,
}

impl Broadcaster {
    /// Create an empty subscriber set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if the session ID is taken.
    pub fn subscribe(&mut self, session_id: u64, sender: OutboundSender) -> bool {
        if self.subscribers.contains_key(&session_id) {
            return false;
        }

        self.subscribers.insert(session_id, sender);
        true
    }

    /// Remove a subscriber. Dropping its sender ends the writer task once the
    /// queue drains.
    pub fn unsubscribe(&mut self, session_id: u64) -> bool {
        self.subscribers.remove(&session_id).is_some()
    }

    /// Queue a frame for one subscriber.
    pub fn send_to(&self, session_id: u64, frame: Frame) -> Result<(), ExecutorError> {
        let sender = self.subscribers.get(&session_id).ok_or_else(|| ExecutorError::SendFailed {
            session_id,
            reason: "no such subscriber".to_string(),
        })?;

        sender
            .send(Outbound::Frame(frame))
            .map_err(|_| ExecutorError::SendFailed { session_id, reason: "writer gone".to_string() })
    }

    /// Queue a frame for every subscriber.
    ///
    /// Returns one error per subscriber whose writer is gone. Delivery to the
    /// rest is unaffected.
    pub fn publish(&self, frame: &Frame) -> Vec<ExecutorError> {
        self.subscribers
            .iter()
            .filter_map(|(&session_id, sender)| {
                sender.send(Outbound::Frame(frame.clone())).err().map(|_| {
                    ExecutorError::SendFailed { session_id, reason: "writer gone".to_string() }
                })
            })
            .collect()
    }

    /// Ask a subscriber's writer to close the connection and drop it.
    pub fn close(&mut self, session_id: u64, reason: String) -> Result<(), ExecutorError> {
        let sender = self.subscribers.remove(&session_id).ok_or_else(|| {
            ExecutorError::SendFailed { session_id, reason: "no such subscriber".to_string() }
        })?;

        sender
            .send(Outbound::Close { reason })
            .map_err(|_| ExecutorError::SendFailed { session_id, reason: "writer gone".to_string() })
    }

    /// Whether a session is subscribed.
    pub fn contains(&self, session_id: u64) -> bool {
        self.subscribers.contains_key(&session_id)
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
