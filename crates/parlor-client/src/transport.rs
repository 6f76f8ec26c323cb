//! WebSocket transport.
//!
//! A thin I/O layer: dial, split the socket, and bridge it to channels. A
//! writer task drains outbound frames, a reader task decodes inbound text
//! frames, and a close (or any stream error) surfaces as a single
//! [`TransportEvent::Closed`] for the session core to react to. Protocol
//! logic stays in `parlor-core`.

use futures_util::{SinkExt, StreamExt};
use parlor_proto::{ClientFrame, ServerFrame};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::TransportError;

/// Outbound channel depth; sends beyond this apply backpressure.
const OUTBOUND_CAPACITY: usize = 64;

/// Inbound channel depth.
const INBOUND_CAPACITY: usize = 256;

/// Events the transport reports to its owner.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded frame from the server.
    Frame(ServerFrame),

    /// The connection is gone; no more frames will arrive.
    Closed {
        /// Human-readable cause, for logging.
        reason: String,
    },
}

/// Handle to a live WebSocket connection.
///
/// Dropping the handle (or calling [`TransportHandle::stop`]) tears the
/// connection down.
#[derive(Debug)]
pub struct TransportHandle {
    /// Frames to put on the wire.
    pub to_server: mpsc::Sender<ClientFrame>,
    /// Frames and lifecycle events from the wire.
    pub from_server: mpsc::Receiver<TransportEvent>,
    writer_task: tokio::task::AbortHandle,
    reader_task: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Abort the I/O tasks, dropping the connection.
    pub fn stop(&self) {
        self.writer_task.abort();
        self.reader_task.abort();
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Dial the chat endpoint and spawn the I/O tasks.
pub async fn dial(url: &str) -> Result<TransportHandle, TransportError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    tracing::info!(url, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ClientFrame>(OUTBOUND_CAPACITY);
    let (in_tx, in_rx) = mpsc::channel::<TransportEvent>(INBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(%error, "failed to encode outbound frame, dropping");
                    continue;
                },
            };
            if let Err(error) = sink.send(Message::Text(text.into())).await {
                tracing::warn!(%error, "websocket send failed");
                break;
            }
        }
    });

    let reader = tokio::spawn(async move {
        let reason = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match ServerFrame::decode(text.as_str()) {
                    Ok(frame) => {
                        if in_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                            break "receiver dropped".to_string();
                        }
                    },
                    // Malformed frames are logged and dropped; the stream
                    // keeps going.
                    Err(error) => tracing::warn!(%error, "dropping undecodable frame"),
                },
                Some(Ok(Message::Close(_))) => break "server closed".to_string(),
                Some(Ok(_)) => {}, // ping/pong/binary: nothing for us
                Some(Err(error)) => break format!("stream error: {error}"),
                None => break "stream ended".to_string(),
            }
        };
        tracing::info!(reason, "websocket reader finished");
        let _ = in_tx.send(TransportEvent::Closed { reason }).await;
    });

    Ok(TransportHandle {
        to_server: out_tx,
        from_server: in_rx,
        writer_task: writer.abort_handle(),
        reader_task: reader.abort_handle(),
    })
}
