//! WebSocket connection management
//! Handles the lifecycle of client connections

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;
use warp::ws::Message;

use crate::core::identity::Identity;
use crate::core::message::Payload;
use crate::error::{HubError, Result};

/// Server-generated unique identifier of a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a connection left the OPEN state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the socket or it ended cleanly
    PeerClosed,
    /// The transport reported an error
    TransportError,
    /// Another connection claimed the same identity
    Evicted,
}

/// Represents the state of a single WebSocket connection.
///
/// A connection starts OPEN and moves to CLOSED exactly once; the outbound
/// side is an unbounded channel drained by the socket's writer task.
pub struct Connection {
    id: ConnectionId,
    identity: Identity,
    sender: mpsc::UnboundedSender<Message>,
    open: AtomicBool,
    close_signal: Notify,
    connected_at: Instant,
}

impl Connection {
    /// Create a new open connection with a unique ID
    pub fn new(identity: Identity, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            sender,
            open: AtomicBool::new(true),
            close_signal: Notify::new(),
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue a payload for delivery to this connection's peer
    pub fn send(&self, payload: &Payload) -> Result<()> {
        if !self.is_open() {
            return Err(HubError::SendFailed {
                connection_id: self.id.to_string(),
                reason: "connection is closed".to_string(),
            });
        }

        self.sender
            .send(payload.to_ws())
            .map_err(|_| HubError::SendFailed {
                connection_id: self.id.to_string(),
                reason: "outbound channel is gone".to_string(),
            })
    }

    /// Move the connection to CLOSED.
    ///
    /// Returns `false` when it was already closed. On eviction a close frame
    /// is queued for the peer; in every case the task awaiting `closed()` is
    /// woken so it can run the disconnect path.
    pub fn close(&self, reason: CloseReason) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }

        if reason == CloseReason::Evicted && self.sender.send(Message::close()).is_err() {
            // Writer already gone; the end state is the same
            debug!("Close frame for connection {} not queued", self.id);
        }

        // notify_one keeps a permit if nobody is waiting yet
        self.close_signal.notify_one();
        debug!(
            "Connection {} ({}) closed: {:?} after {:?}",
            self.id,
            self.identity,
            reason,
            self.connection_duration()
        );
        true
    }

    /// Resolves once the connection has been closed by any path
    pub async fn closed(&self) {
        if !self.is_open() {
            return;
        }
        self.close_signal.notified().await;
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("open", &self.is_open())
            .finish()
    }
}
