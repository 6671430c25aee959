//! Listener and shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::router::build_router;
use crate::state::AppState;

/// How long shutdown waits for sessions to finish tearing down
pub const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The console server
pub struct ConsoleServer {
    state: Arc<AppState>,
}

impl ConsoleServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Bind to `bind_addr` and serve until shutdown
    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until `state.shutdown` is cancelled
    ///
    /// Cancelling stops accepting connections and tears down every open
    /// session before returning.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Console server listening on {}", local_addr);

        let app = build_router(Arc::clone(&self.state));
        let shutdown = self.state.shutdown.clone();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Console server shutting down");
        })
        .await
        .context("Server error")?;

        let sessions = &self.state.sessions;
        sessions.close();
        if tokio::time::timeout(SESSION_DRAIN_TIMEOUT, sessions.wait())
            .await
            .is_err()
        {
            warn!(
                "{} sessions still open after {:?}",
                sessions.len(),
                SESSION_DRAIN_TIMEOUT
            );
        }

        info!("Console server stopped");
        Ok(())
    }
}
