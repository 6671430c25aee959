//! Serialized writes to the client connection

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use dc_core::ConsoleError;
use dc_protocol::ServerMessage;

use super::frame_to_message;

/// Upper bound on delivering the close frame to a peer that stopped reading
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Write half of a client connection
///
/// Every outgoing frame goes through the one lock, so output chunks,
/// pong replies and the final close frame never interleave.
pub struct ConnectionWriter {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl ConnectionWriter {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Send a protocol message
    pub async fn send(&self, message: ServerMessage) -> Result<(), ConsoleError> {
        self.send_raw(frame_to_message(message.into_frame())).await
    }

    /// Send a WebSocket message as-is
    pub async fn send_raw(&self, message: Message) -> Result<(), ConsoleError> {
        let mut sink = self.sink.lock().await;
        sink.send(message)
            .await
            .map_err(|e| ConsoleError::Transport(e.to_string()))
    }

    /// Send a close frame and shut the write half
    ///
    /// Errors are ignored; the peer may already be gone. Gives up after
    /// `CLOSE_TIMEOUT`.
    pub async fn close(&self, frame: Option<CloseFrame<'static>>) {
        let closed = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(frame)).await {
                trace!("Close frame not delivered: {}", e);
            }
            let _ = sink.close().await;
        })
        .await;

        if closed.is_err() {
            debug!("Peer did not accept the close frame within {:?}", CLOSE_TIMEOUT);
        }
    }
}
