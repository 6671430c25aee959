//! The two relay loops of an active session
//!
//! Each loop ends the whole session when it stops, so losing either side
//! of the bridge brings the other one down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::SplitStream;
use futures::StreamExt;
use tracing::{debug, trace, warn};

use dc_core::traits::{ProcessInput, ProcessOutput};
use dc_protocol::{ClientMessage, Frame, ServerMessage};

use super::session::{CloseReason, Session};

/// Copy process output to the client until either side stops
pub async fn outbound(session: Arc<Session>, mut output: Box<dyn ProcessOutput>) {
    let reason = loop {
        let chunk = tokio::select! {
            _ = session.cancelled() => break CloseReason::Shutdown,
            chunk = output.read_chunk() => chunk,
        };

        match chunk {
            Ok(Some(data)) => {
                trace!("{} -> client {} bytes", session.id(), data.len());
                if let Err(e) = session.send(ServerMessage::Output(data)).await {
                    break CloseReason::Transport(e.to_string());
                }
            }
            Ok(None) => break CloseReason::ProcessExited,
            Err(e) => break CloseReason::OutputFailed(e.to_string()),
        }
    };

    session.close(reason).await;
}

/// Dispatch client frames until either side stops
pub async fn inbound(
    session: Arc<Session>,
    mut stream: SplitStream<WebSocket>,
    mut input: Box<dyn ProcessInput>,
    permit_write: bool,
) {
    let reason = loop {
        let next = tokio::select! {
            _ = session.cancelled() => break CloseReason::Shutdown,
            next = stream.next() => next,
        };

        let frame = match next {
            Some(Ok(Message::Text(text))) => Frame::Text(text),
            Some(Ok(Message::Binary(data))) => Frame::Binary(Bytes::from(data)),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
            Some(Err(e)) => break CloseReason::Transport(e.to_string()),
        };

        let message = match ClientMessage::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("{} sent an invalid frame: {}", session.id(), e);
                break CloseReason::Protocol(e.to_string());
            }
        };

        match message {
            ClientMessage::Input(data) => {
                if !permit_write {
                    debug!("{} read-only, dropping {} input bytes", session.id(), data.len());
                    continue;
                }
                let written = tokio::select! {
                    _ = session.cancelled() => break CloseReason::Shutdown,
                    written = input.write_all(data) => written,
                };
                if let Err(e) = written {
                    break CloseReason::InputFailed(e.to_string());
                }
            }
            ClientMessage::Ping => {
                if let Err(e) = session.send(ServerMessage::Pong).await {
                    break CloseReason::Transport(e.to_string());
                }
            }
            ClientMessage::Resize(size) => {
                debug!("{} resize to {}x{}", session.id(), size.cols, size.rows);
                if let Err(e) = session.control().resize(size) {
                    warn!("{} resize failed: {}", session.id(), e);
                }
            }
        }
    };

    session.close(reason).await;
}
