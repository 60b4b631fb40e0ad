//! WebSocket observe stream.
//!
//! An observer gets the current snapshot as soon as the socket opens, then one
//! text frame per notification from the resource runtime.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use aquanode_device::{ResourceHandle, Snapshot};

use crate::state::GatewayState;

/// Upgrade to a WebSocket that streams resource notifications.
pub async fn observe(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    let resource = state.resource.clone();
    tracing::info!(path = %resource.path(), "Observer connecting");
    ws.on_upgrade(move |socket| stream_notifications(socket, resource))
}

async fn stream_notifications(socket: WebSocket, resource: ResourceHandle) {
    // Subscribe before the initial read so nothing published in between is lost.
    let mut notifications = resource.subscribe();

    let current = match resource.read().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot read resource for new observer");
            return;
        }
    };

    let (mut sink, mut incoming) = socket.split();
    if let Err(e) = send_snapshot(&mut sink, &current).await {
        tracing::debug!(error = %e, "Observer went away before the first frame");
        return;
    }

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Ok(snapshot) => {
                    if let Err(e) = send_snapshot(&mut sink, &snapshot).await {
                        tracing::debug!(error = %e, "Observer send failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Observer lagged, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Observer read failed");
                    break;
                }
            },
        }
    }

    tracing::info!(path = %resource.path(), "Observer disconnected");
}

async fn send_snapshot(
    sink: &mut SplitSink<WebSocket, Message>,
    snapshot: &Snapshot,
) -> Result<(), String> {
    let text = serde_json::to_string(snapshot).map_err(|e| e.to_string())?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| e.to_string())
}
