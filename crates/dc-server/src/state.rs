//! Shared server state

use std::sync::Arc;

use axum::http::HeaderValue;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use dc_core::config::{local_hostname, ConsoleConfig};
use dc_core::traits::ProcessLauncher;

/// Product name advertised in the `Server` response header
pub const SERVER_NAME: &str = "docker-console";

/// Name and version the server identifies itself with
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    header: HeaderValue,
}

impl ServerIdentity {
    /// Identity of this build
    pub fn current() -> Self {
        Self {
            header: HeaderValue::from_static(concat!(
                "docker-console/",
                env!("CARGO_PKG_VERSION")
            )),
        }
    }

    /// Value for the `Server` header, `docker-console/<version>`
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self::current()
    }
}

/// State shared by the router and every session
pub struct AppState {
    /// Effective configuration
    pub config: Arc<ConsoleConfig>,

    /// Starts the shell process for an authenticated connection
    pub launcher: Arc<dyn ProcessLauncher>,

    pub identity: ServerIdentity,

    /// Host name used when rendering window titles
    pub hostname: String,

    /// Cancelled when the server shuts down; every session token is a child
    pub shutdown: CancellationToken,

    /// Tracks running sessions so shutdown can wait for them
    pub sessions: TaskTracker,
}

impl AppState {
    pub fn new(config: ConsoleConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
            identity: ServerIdentity::current(),
            hostname: local_hostname(),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }
}
