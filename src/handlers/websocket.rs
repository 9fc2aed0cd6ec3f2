use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::CloseReason;
use crate::core::hub::SharedHub;
use crate::core::message::Payload;

// Handle a WebSocket connection opened at `uri` (path plus query string)
pub async fn handle_ws_client(ws: WebSocket, uri: String, hub: SharedHub) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Spawn a task to forward messages from our channel to the WebSocket
    tokio::task::spawn(async move {
        while let Some(message) = rx.recv().await {
            let is_close = message.is_close();
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
            if is_close {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let conn = match hub.connect(&uri, tx).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to register client from {}: {}", uri, e);
            return;
        }
    };

    // Handle incoming messages until the peer leaves or the connection is evicted
    let reason = loop {
        tokio::select! {
            _ = conn.closed() => break CloseReason::Evicted,
            frame = ws_rx.next() => match frame {
                Some(Ok(msg)) => {
                    if msg.is_close() {
                        break CloseReason::PeerClosed;
                    }
                    if let Some(payload) = Payload::from_ws(msg) {
                        hub.on_payload(&conn, payload).await;
                    }
                }
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", conn.id(), e);
                    break CloseReason::TransportError;
                }
                None => break CloseReason::PeerClosed,
            },
        }
    };

    // Client disconnected
    hub.disconnect(&conn, reason).await;
}
