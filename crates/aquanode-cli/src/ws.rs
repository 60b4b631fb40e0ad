//! WebSocket client for the observe stream.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use aquanode_device::Snapshot;

/// Events from the observe stream.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A snapshot pushed by the device.
    Snapshot(Snapshot),
    /// A frame that did not parse as a snapshot.
    Unparsed(String),
    /// The device closed the stream.
    Disconnected,
}

/// WebSocket error type.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Connect to an observe stream.
///
/// Returns a receiver of events; a background task reads the socket.
pub async fn connect(url: &str) -> Result<mpsc::Receiver<WatchEvent>, WsError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| WsError::Connection(e.to_string()))?;

    let (_write, read) = ws_stream.split();
    let (event_tx, event_rx) = mpsc::channel::<WatchEvent>(32);

    tokio::spawn(ws_reader(read, event_tx));

    Ok(event_rx)
}

/// Task that reads incoming frames and sends events.
async fn ws_reader(
    mut read: futures::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    tx: mpsc::Sender<WatchEvent>,
) {
    while let Some(result) = read.next().await {
        let event = match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<Snapshot>(&text) {
                Ok(snapshot) => WatchEvent::Snapshot(snapshot),
                Err(e) => {
                    tracing::debug!(error = %e, "Unparsed frame");
                    WatchEvent::Unparsed(text)
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Observe stream error");
                break;
            }
        };

        if tx.send(event).await.is_err() {
            return;
        }
    }

    let _ = tx.send(WatchEvent::Disconnected).await;
}
