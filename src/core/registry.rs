use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::RwLock;

use crate::core::connection::{CloseReason, Connection, ConnectionId};
use crate::core::identity::Identity;
use crate::core::message::Payload;
use crate::error::{HubError, Result};

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    // Secondary index for identity arbitration
    by_identity: HashMap<Identity, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn insert(&mut self, conn: Arc<Connection>) {
        self.by_identity
            .entry(conn.identity().clone())
            .or_default()
            .insert(conn.id().clone());
        self.connections.insert(conn.id().clone(), conn);
    }

    fn remove(&mut self, id: &ConnectionId) -> Option<Arc<Connection>> {
        let conn = self.connections.remove(id)?;
        if let Some(ids) = self.by_identity.get_mut(conn.identity()) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_identity.remove(conn.identity());
            }
        }
        Some(conn)
    }
}

/// Concurrency-safe set of live connections.
///
/// All locking is internal. Broadcasts work on a snapshot taken under a read
/// lock, so deliveries never hold the lock and concurrent add/remove calls are
/// never blocked by a slow recipient.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; the same connection can never be added twice
    pub async fn add(&self, conn: Arc<Connection>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.connections.contains_key(conn.id()) {
            return Err(HubError::DuplicateConnection(conn.id().to_string()));
        }
        inner.insert(conn);
        Ok(())
    }

    /// Register a connection after evicting every entry with the same identity.
    ///
    /// Displaced entries are removed and closed before the newcomer is
    /// inserted, all under one write lock, so no two open connections ever
    /// share an identity. The displaced connections are returned for
    /// reporting. The `unknown` identity never displaces anything.
    pub async fn admit_exclusive(&self, conn: Arc<Connection>) -> Result<Vec<Arc<Connection>>> {
        let mut inner = self.inner.write().await;
        if inner.connections.contains_key(conn.id()) {
            return Err(HubError::DuplicateConnection(conn.id().to_string()));
        }

        let mut displaced = Vec::new();
        if !conn.identity().is_unknown() {
            let same_identity: Vec<ConnectionId> = inner
                .by_identity
                .get(conn.identity())
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default();
            for id in same_identity {
                if let Some(old) = inner.remove(&id) {
                    // Already-closed entries are fine; only their absence matters
                    old.close(CloseReason::Evicted);
                    displaced.push(old);
                }
            }
        }

        inner.insert(conn);
        Ok(displaced)
    }

    /// Remove a connection; removing an absent connection is a no-op
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.inner.read().await.connections.contains_key(id)
    }

    /// Point-in-time copy of the live connections
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.inner.read().await.connections.values().cloned().collect()
    }

    /// Connections currently registered under an identity
    pub async fn with_identity(&self, identity: &Identity) -> Vec<Arc<Connection>> {
        let inner = self.inner.read().await;
        inner
            .by_identity
            .get(identity)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.connections.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver a payload to every open connection except the sender.
    ///
    /// A failed recipient is logged and skipped; it never stops delivery to
    /// the others.
    pub async fn broadcast(&self, sender_id: &ConnectionId, payload: &Payload) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for conn in self.snapshot().await {
            // Don't send the message back to its sender
            if conn.id() == sender_id || !conn.is_open() {
                continue;
            }

            match conn.send(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Broadcast {:?} payload from {}: {} delivered, {} failed",
            payload.kind(),
            sender_id,
            report.delivered,
            report.failed
        );
        report
    }

    // Get current clients count
    pub async fn len(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
