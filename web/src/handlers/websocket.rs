//! WebSocket relay for the event change feed.
//!
//! Pushes every [`ChangeNotice`] of a subscription to the client as JSON.
//! Clients only listen; the one message they may send is a ping.
//!
//! # Message Protocol
//!
//! **Server → Client (Change):**
//! ```json
//! {
//!   "type": "change",
//!   "op": "UPDATE",
//!   "event_id": "550e8400-...",
//!   "event": { "id": "550e8400-...", "available_seats": 41, ... }
//! }
//! ```
//!
//! **Client → Server:** `{"type":"ping"}`, answered with `{"type":"pong"}`.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, stream::StreamExt};
use seatledger_core::feed::{ChangeNotice, ChangeStream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

/// Keep-alive ping interval.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A row changed
    Change(ChangeNotice),
    /// Something went wrong on the server side
    Error {
        /// Error description
        message: String,
    },
    /// Keep-alive request from the client
    Ping,
    /// Keep-alive answer
    Pong,
}

impl WsMessage {
    fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json)),
            Err(e) => {
                warn!(error = %e, "Failed to serialize websocket message");
                None
            }
        }
    }
}

/// Relay `changes` over one upgraded socket until the client leaves.
///
/// Runs a sender task (change notices, pongs, keep-alive pings) and a
/// receiver task (client pings, close); whichever ends first aborts the other.
pub async fn relay_socket(socket: WebSocket, mut changes: ChangeStream) {
    info!("Change feed subscriber connected");
    metrics::gauge!("seatledger_ws_connections").increment(1.0);

    let (mut sender, mut receiver) = socket.split();
    let (pong_tx, mut pong_rx) = mpsc::channel::<()>(8);

    let mut send_task = tokio::spawn(async move {
        let mut keep_alive = interval(PING_INTERVAL);
        keep_alive.tick().await;
        loop {
            let frame = tokio::select! {
                notice = changes.next() => match notice {
                    Some(notice) => WsMessage::Change(notice).to_frame(),
                    None => {
                        let _ = sender
                            .send(Message::Close(None))
                            .await;
                        break;
                    }
                },
                Some(()) = pong_rx.recv() => WsMessage::Pong.to_frame(),
                _ = keep_alive.tick() => Some(Message::Ping(Vec::new())),
            };
            let Some(frame) = frame else { continue };
            if sender.send(frame).await.is_err() {
                // Client disconnected
                break;
            }
        }
        debug!("WebSocket send task terminated");
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Ping) => {
                        if pong_tx.send(()).await.is_err() {
                            break;
                        }
                    }
                    Ok(other) => warn!(?other, "Unexpected message from subscriber"),
                    Err(e) => debug!(error = %e, "Ignoring unparseable subscriber message"),
                },
                Message::Close(_) => break,
                // Protocol pongs are answered by axum
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        debug!("WebSocket receive task terminated");
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    metrics::gauge!("seatledger_ws_connections").decrement(1.0);
    info!("Change feed subscriber disconnected");
}
