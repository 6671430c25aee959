//! Session bridge
//!
//! Drives one client connection through its lifecycle:
//!
//! 1. **Authenticating**: the first frame must be an init request with a
//!    valid fingerprint. A rejected client gets a plain text reason and the
//!    connection is closed.
//! 2. **Launching**: a shell is started in the requested container. If that
//!    fails the connection is closed without a message.
//! 3. **Active**: title, preferences and reconnect delay are sent, then
//!    output and input are relayed until either side ends.
//! 4. **Closed**: the process is terminated and the connection closed,
//!    exactly once.

mod relay;
mod session;
mod writer;

pub use session::{CloseReason, Session};
pub use writer::{ConnectionWriter, CLOSE_TIMEOUT};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::SplitStream;
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use dc_core::traits::{ProcessInput, ProcessOutput, SpawnedProcess};
use dc_core::ConsoleError;
use dc_protocol::{Frame, InitRequest};

use crate::auth;
use crate::state::AppState;

/// Convert a protocol frame into a WebSocket message
pub fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data.to_vec()),
    }
}

/// Run a client connection to completion
pub async fn run_session(socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let (sink, mut stream) = socket.split();
    let writer = Arc::new(ConnectionWriter::new(sink));

    let parts = match open_session(&mut stream, &writer, &state, peer).await {
        Ok(Some(parts)) => parts,
        Ok(None) => return,
        Err(ConsoleError::Auth(e)) => {
            if let Err(send_err) = writer.send_raw(Message::Text(e.to_string())).await {
                debug!("Rejection not delivered to {}: {}", peer, send_err);
            }
            writer.close(None).await;
            return;
        }
        Err(e) => {
            error!("Failed to open a session for {}: {}", peer, e);
            writer.close(None).await;
            return;
        }
    };

    let SessionParts {
        session,
        output,
        input,
    } = parts;
    info!(
        "{} started for {} in {}",
        session.id(),
        peer,
        session.container()
    );

    if let Err(e) = session.send_greeting(&state.config, &state.hostname).await {
        session.close(CloseReason::Transport(e.to_string())).await;
        return;
    }

    let outbound = tokio::spawn(relay::outbound(Arc::clone(&session), output));
    let inbound = tokio::spawn(relay::inbound(
        Arc::clone(&session),
        stream,
        input,
        state.config.permit_write,
    ));

    let (out_result, in_result) = tokio::join!(outbound, inbound);
    for result in [out_result, in_result] {
        if let Err(e) = result {
            error!("{} relay task failed: {}", session.id(), e);
        }
    }

    // A panicked relay never reached its own close call
    session.close(CloseReason::Shutdown).await;
    debug!("{} finished", session.id());
}

/// A session together with the process I/O its relays will own
struct SessionParts {
    session: Arc<Session>,
    output: Box<dyn ProcessOutput>,
    input: Box<dyn ProcessInput>,
}

/// Authenticate the connection and start its process
///
/// `Ok(None)` means the client left before sending an init request.
async fn open_session(
    stream: &mut SplitStream<WebSocket>,
    writer: &Arc<ConnectionWriter>,
    state: &AppState,
    peer: SocketAddr,
) -> Result<Option<SessionParts>, ConsoleError> {
    let Some(frame) = read_init_frame(stream, peer).await else {
        return Ok(None);
    };

    let init = match InitRequest::decode(&frame) {
        Ok(init) => init,
        Err(e) => {
            debug!("Unreadable init request from {}: {}", peer, e);
            InitRequest::default()
        }
    };

    let container = match auth::authenticate(&init) {
        Ok(container) => container,
        Err(e) => {
            warn!(
                "Rejected {} (t_id={:?}, s_id={:?}, c_id={:?}): {}",
                peer, init.target_id, init.session_id, init.client_id, e
            );
            return Err(e.into());
        }
    };
    info!("{} authenticated for container {}", peer, container);

    let SpawnedProcess {
        output,
        input,
        control,
    } = state.launcher.launch(&container).await?;

    let session = Session::new(
        peer,
        container,
        Arc::clone(writer),
        control,
        state.shutdown.child_token(),
    );
    Ok(Some(SessionParts {
        session: Arc::new(session),
        output,
        input,
    }))
}

/// Read the first data frame, skipping keepalives
async fn read_init_frame(stream: &mut SplitStream<WebSocket>, peer: SocketAddr) -> Option<Frame> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Some(Frame::Text(text)),
            Some(Ok(Message::Binary(data))) => return Some(Frame::Binary(Bytes::from(data))),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                info!("{} disconnected before sending an init request", peer);
                return None;
            }
            Some(Err(e)) => {
                warn!("Failed to read init request from {}: {}", peer, e);
                return None;
            }
        }
    }
}
