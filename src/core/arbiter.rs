//! Single-active-connection-per-identity policy

use std::sync::Arc;

use log::info;

use crate::core::connection::{Connection, ConnectionId};
use crate::core::registry::ConnectionRegistry;
use crate::error::Result;

/// Admits new connections, evicting older ones that share their identity.
///
/// Last writer wins: the newest connection for an identity stays, every
/// earlier one is closed before the newcomer becomes visible. Connections with
/// the `unknown` identity are never arbitrated.
pub struct SessionArbiter {
    registry: Arc<ConnectionRegistry>,
}

impl SessionArbiter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Admit `conn` to the registry and return the ids of evicted connections
    pub async fn admit(&self, conn: Arc<Connection>) -> Result<Vec<ConnectionId>> {
        let identity = conn.identity().clone();
        let new_id = conn.id().clone();
        let displaced = self.registry.admit_exclusive(conn).await?;

        let mut evicted = Vec::with_capacity(displaced.len());
        for old in displaced {
            info!(
                "Evicted connection {} for identity '{}' in favour of {}",
                old.id(),
                identity,
                new_id
            );
            evicted.push(old.id().clone());
        }

        Ok(evicted)
    }
}
