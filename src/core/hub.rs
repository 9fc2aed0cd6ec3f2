//! The chat hub: owns the registry and drives the connection lifecycle

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::config::ServerConfig;
use crate::core::arbiter::SessionArbiter;
use crate::core::connection::{CloseReason, Connection};
use crate::core::identity::resolve_identity;
use crate::core::message::{Capabilities, Payload};
use crate::core::registry::ConnectionRegistry;
use crate::core::router::{MessageRouter, RouteOutcome};
use crate::error::Result;
use crate::storage::media::{FileMediaSink, MediaSink};

/// Real-time connection hub.
///
/// Lifecycle: `connect` resolves the identity, evicts same-identity
/// survivors and registers the connection; `on_payload` relays inbound
/// frames; `disconnect` closes and unregisters. Every closure path ends in
/// `disconnect`, and calling it more than once is harmless.
pub struct ChatHub {
    registry: Arc<ConnectionRegistry>,
    arbiter: SessionArbiter,
    router: MessageRouter,
}

impl ChatHub {
    pub fn new(media_sink: Option<Arc<dyn MediaSink>>, capabilities: Capabilities) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            arbiter: SessionArbiter::new(registry.clone()),
            router: MessageRouter::new(registry.clone(), media_sink, capabilities),
            registry,
        }
    }

    /// Build a hub persisting binary payloads to the configured media directory
    pub fn from_config(config: &ServerConfig) -> Self {
        let media_sink = if config.capabilities.binary {
            Some(Arc::new(FileMediaSink::new(config.media_dir.clone())) as Arc<dyn MediaSink>)
        } else {
            None
        };
        Self::new(media_sink, config.capabilities)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Open a connection for the socket behind `sender`, identified from its URI
    pub async fn connect(
        &self,
        uri: &str,
        sender: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<Arc<Connection>> {
        let identity = resolve_identity(uri);
        let conn = Arc::new(Connection::new(identity, sender));

        let evicted = self.arbiter.admit(conn.clone()).await?;

        info!(
            "Client connected: {} as '{}' ({} evicted)",
            conn.id(),
            conn.identity(),
            evicted.len()
        );
        info!("Current connections: {}", self.registry.len().await);
        Ok(conn)
    }

    /// Relay one inbound payload from `conn`
    pub async fn on_payload(&self, conn: &Connection, payload: Payload) -> RouteOutcome {
        debug!(
            "Received {:?} payload of {} bytes from {}",
            payload.kind(),
            payload.len(),
            conn.id()
        );
        self.router.route(conn, payload).await
    }

    /// Close and unregister a connection
    pub async fn disconnect(&self, conn: &Connection, reason: CloseReason) {
        conn.close(reason);
        if self.registry.remove(conn.id()).await {
            info!("Client disconnected: {} ({:?})", conn.id(), reason);
            info!("Current connections: {}", self.registry.len().await);
        } else {
            debug!("Connection {} was already unregistered", conn.id());
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }
}

/// Shared reference to the hub
pub type SharedHub = Arc<ChatHub>;

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<WsMessage>,
        mpsc::UnboundedReceiver<WsMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_alice_bob_scenario() {
        let hub = ChatHub::new(None, Capabilities::all());
        let (ta, mut ra) = channel();
        let (tb, mut rb) = channel();
        let (tc, mut rc) = channel();

        let a = hub.connect("/chat?id=alice", ta).await.unwrap();
        let b = hub.connect("/chat?id=alice", tb).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);
        assert!(!a.is_open());
        assert!(ra.try_recv().unwrap().is_close());

        let _c = hub.connect("/chat?id=bob", tc).await.unwrap();
        hub.on_payload(&b, Payload::Text("hi".to_string())).await;

        assert_eq!(rc.try_recv().unwrap().to_str().unwrap(), "hi");
        assert!(rb.try_recv().is_err());
        assert!(ra.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_evicted_connection_cannot_reach_its_successor() {
        let hub = ChatHub::new(None, Capabilities::all());
        let (ta, _ra) = channel();
        let (tb, mut rb) = channel();

        let a = hub.connect("/chat?id=alice", ta).await.unwrap();
        let _b = hub.connect("/chat?id=alice", tb).await.unwrap();

        // a frame already read off the old socket arrives after the takeover
        let outcome = hub.on_payload(&a, Payload::Text("stale".to_string())).await;

        assert!(matches!(outcome, RouteOutcome::SenderClosed));
        assert!(rb.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = ChatHub::new(None, Capabilities::all());
        let (tx, _rx) = channel();
        let conn = hub.connect("/chat", tx).await.unwrap();

        hub.disconnect(&conn, CloseReason::PeerClosed).await;
        hub.disconnect(&conn, CloseReason::TransportError).await;

        assert_eq!(hub.connection_count().await, 0);
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_membership_tracks_open_minus_closed() {
        let hub = ChatHub::new(None, Capabilities::all());
        let mut live = Vec::new();
        let mut receivers = Vec::new();

        for i in 0..10 {
            let (tx, rx) = channel();
            receivers.push(rx);
            live.push(hub.connect(&format!("/chat?id=user{}", i), tx).await.unwrap());
        }
        for conn in live.iter().step_by(3) {
            hub.disconnect(conn, CloseReason::PeerClosed).await;
        }

        let expected: std::collections::HashSet<_> = live
            .iter()
            .filter(|c| c.is_open())
            .map(|c| c.id().clone())
            .collect();
        let actual: std::collections::HashSet<_> = hub
            .registry()
            .snapshot()
            .await
            .iter()
            .map(|c| c.id().clone())
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 6);
    }
}
