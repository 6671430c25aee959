//! Per-connection session
//!
//! A session owns the connection writer and the process control handle.
//! Teardown is claimed exactly once: whichever relay finishes first (or the
//! server shutdown) tears down both sides, later attempts do nothing.

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use dc_core::config::{render_title, ConsoleConfig, TitleVars};
use dc_core::traits::ProcessControl;
use dc_core::{ConsoleError, ContainerId, OnceClaim, SessionId};
use dc_protocol::ServerMessage;

use super::writer::ConnectionWriter;

/// Longest close reason a WebSocket control frame can carry
const MAX_CLOSE_REASON: usize = 123;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame or the connection ended
    ClientClosed,
    /// Process closed its output
    ProcessExited,
    /// Server is shutting down
    Shutdown,
    /// Client sent a frame that could not be decoded
    Protocol(String),
    /// Connection read or write failed
    Transport(String),
    /// Reading process output failed
    OutputFailed(String),
    /// Writing process input failed
    InputFailed(String),
}

impl CloseReason {
    /// Close frame to send for this reason
    ///
    /// Only protocol violations carry a code and reason; everything else
    /// closes without a payload.
    pub fn close_frame(&self) -> Option<CloseFrame<'static>> {
        match self {
            CloseReason::Protocol(reason) => Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: Cow::Owned(truncate(reason, MAX_CLOSE_REASON).to_string()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client closed the connection"),
            CloseReason::ProcessExited => write!(f, "process exited"),
            CloseReason::Shutdown => write!(f, "server shutting down"),
            CloseReason::Protocol(e) => write!(f, "protocol error: {}", e),
            CloseReason::Transport(e) => write!(f, "transport error: {}", e),
            CloseReason::OutputFailed(e) => write!(f, "output read failed: {}", e),
            CloseReason::InputFailed(e) => write!(f, "input write failed: {}", e),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// An active terminal session
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    container: ContainerId,
    writer: Arc<ConnectionWriter>,
    control: Arc<dyn ProcessControl>,
    closed: OnceClaim,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        peer: SocketAddr,
        container: ContainerId,
        writer: Arc<ConnectionWriter>,
        control: Arc<dyn ProcessControl>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            container,
            writer,
            control,
            closed: OnceClaim::new(),
            cancel,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn control(&self) -> &Arc<dyn ProcessControl> {
        &self.control
    }

    /// Resolves once teardown has started
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Send a message unless the session is being torn down
    pub async fn send(&self, message: ServerMessage) -> Result<(), ConsoleError> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(ConsoleError::Transport("session closed".to_string()))
            }
            result = self.writer.send(message) => result,
        }
    }

    /// Send the title, preferences and reconnect messages
    pub async fn send_greeting(
        &self,
        config: &ConsoleConfig,
        hostname: &str,
    ) -> Result<(), ConsoleError> {
        let remote_addr = self.peer.to_string();
        let title = render_title(
            &config.title_format,
            &TitleVars {
                container: self.container.as_str(),
                hostname,
                remote_addr: &remote_addr,
                pid: self.control.pid(),
            },
        );
        self.send(ServerMessage::SetWindowTitle(title)).await?;
        self.send(ServerMessage::SetPreferences(config.preferences.to_json()))
            .await?;

        if config.enable_reconnect {
            let secs = config.reconnect_time.as_secs();
            debug!("{} reconnect after {}s", self.id, secs);
            self.send(ServerMessage::SetReconnect(secs)).await?;
        }
        Ok(())
    }

    /// Tear the session down
    ///
    /// Returns true for the call that performed the teardown.
    pub async fn close(&self, reason: CloseReason) -> bool {
        if self.closed.claim().is_err() {
            trace!("{} already closed, ignoring: {}", self.id, reason);
            return false;
        }

        info!(
            "Closing {} ({} from {}): {}",
            self.id, self.container, self.peer, reason
        );
        self.cancel.cancel();

        match self.control.terminate().await {
            Ok(Some(code)) => info!("{} process exited with code {}", self.id, code),
            Ok(None) => debug!("{} process already reaped", self.id),
            Err(e) => warn!("{} failed to terminate process: {}", self.id, e),
        }

        self.writer.close(reason.close_frame()).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_protocol_errors_carry_close_frame() {
        let frame = CloseReason::Protocol("unknown message type 0x39".into())
            .close_frame()
            .unwrap();
        assert_eq!(frame.code, close_code::UNSUPPORTED);
        assert_eq!(frame.reason, "unknown message type 0x39");

        assert!(CloseReason::ClientClosed.close_frame().is_none());
        assert!(CloseReason::ProcessExited.close_frame().is_none());
        assert!(CloseReason::Transport("reset".into()).close_frame().is_none());
    }

    #[test]
    fn test_close_reason_is_truncated() {
        let long = "é".repeat(100);
        let frame = CloseReason::Protocol(long).close_frame().unwrap();
        assert!(frame.reason.len() <= MAX_CLOSE_REASON);
        assert!(frame.reason.chars().all(|c| c == 'é'));
    }
}
