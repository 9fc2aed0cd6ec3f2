//! Relays inbound payloads to every other live connection

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::core::connection::Connection;
use crate::core::message::{Capabilities, Payload};
use crate::core::registry::{BroadcastReport, ConnectionRegistry};
use crate::error::Result;
use crate::storage::media::{MediaReceipt, MediaSink};

/// What happened to one inbound payload
#[derive(Debug)]
pub enum RouteOutcome {
    /// The payload was broadcast; binary payloads also carry the sink result
    Relayed {
        broadcast: BroadcastReport,
        media: Option<Result<MediaReceipt>>,
    },
    /// The payload kind is disabled on this hub
    Unsupported,
    /// The sender was already closed
    SenderClosed,
}

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    media_sink: Option<Arc<dyn MediaSink>>,
    capabilities: Capabilities,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        media_sink: Option<Arc<dyn MediaSink>>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            registry,
            media_sink,
            capabilities,
        }
    }

    /// Broadcast a payload from `sender` to all other open connections.
    ///
    /// Binary payloads are handed to the media sink concurrently with the
    /// broadcast. Neither side's failure affects the other; both are only
    /// logged.
    pub async fn route(&self, sender: &Connection, payload: Payload) -> RouteOutcome {
        if !sender.is_open() {
            debug!("Dropping payload from closed connection {}", sender.id());
            return RouteOutcome::SenderClosed;
        }

        if !self.capabilities.supports(payload.kind()) {
            debug!(
                "Dropping {:?} payload from {}: not enabled on this hub",
                payload.kind(),
                sender.id()
            );
            return RouteOutcome::Unsupported;
        }

        match (&payload, &self.media_sink) {
            (Payload::Binary(data), Some(sink)) => {
                let (media, broadcast) = tokio::join!(
                    sink.store(sender.id(), data),
                    self.registry.broadcast(sender.id(), &payload)
                );

                match &media {
                    Ok(receipt) => debug!(
                        "Persisted {} bytes from {} to {}",
                        receipt.bytes,
                        sender.id(),
                        receipt.path.display()
                    ),
                    Err(e) => error!("Media payload from {} not persisted: {}", sender.id(), e),
                }
                self.log_broadcast(sender, &broadcast);

                RouteOutcome::Relayed {
                    broadcast,
                    media: Some(media),
                }
            }
            _ => {
                let broadcast = self.registry.broadcast(sender.id(), &payload).await;
                self.log_broadcast(sender, &broadcast);
                RouteOutcome::Relayed {
                    broadcast,
                    media: None,
                }
            }
        }
    }

    fn log_broadcast(&self, sender: &Connection, report: &BroadcastReport) {
        if report.failed > 0 {
            warn!(
                "Broadcast from {} reached {} clients, {} sends failed",
                sender.id(),
                report.delivered,
                report.failed
            );
        } else {
            info!("Broadcast message to {} clients from {}", report.delivered, sender.id());
        }
    }
}
