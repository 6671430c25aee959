//! docker-console server daemon
//!
//! Serves browser terminals for docker containers over WebSocket.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dc_core::config::{self, ConsoleConfig};
use dc_core::OnceClaim;
use dc_launcher::DockerExecLauncher;
use dc_server::{AppState, ConsoleServer};

/// Exit code used when a second signal forces the process down
const FORCED_EXIT_CODE: i32 = 5;

#[derive(Parser)]
#[command(name = "docker-console")]
#[command(about = "Browser terminal server for docker containers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "DC_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on (overrides config)
    #[arg(short, long, env = "DC_ADDRESS")]
    address: Option<String>,

    /// Port number to listen on (overrides config)
    #[arg(short, long, env = "DC_PORT")]
    port: Option<u16>,

    /// Session key handed to the front end (overrides config)
    #[arg(long, env = "DC_SESSION_KEY")]
    session_key: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("docker-console {} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config: ConsoleConfig = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                ConsoleConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            ConsoleConfig::default()
        }
    };

    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(session_key) = args.session_key {
        config.session_key = session_key;
    }

    config.validate().context("Invalid configuration")?;

    let bind_addr = config.listen_address();
    tracing::info!("Session key: {}", config.session_key);
    if !config.permit_write {
        tracing::info!("Client input is disabled (read-only sessions)");
    }

    let launcher = Arc::new(DockerExecLauncher::from_config(&config));
    let state = Arc::new(AppState::new(config, launcher));

    spawn_signal_handler(state.shutdown.clone());

    let server = ConsoleServer::new(Arc::clone(&state));
    server.run(&bind_addr).await?;

    tracing::info!("docker-console shutdown complete");
    Ok(())
}

/// Cancel `shutdown` on the first SIGINT/SIGTERM and force exit on the next
fn spawn_signal_handler(shutdown: CancellationToken) {
    static EXITING: OnceClaim = OnceClaim::new();

    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    None
                }
            };

        loop {
            #[cfg(unix)]
            let terminated = async {
                match terminate.as_mut() {
                    Some(signal) => {
                        signal.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            #[cfg(not(unix))]
            let terminated = std::future::pending::<()>();

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                        return;
                    }
                    tracing::info!("Received Ctrl+C");
                }
                _ = terminated => {
                    tracing::info!("Received SIGTERM");
                }
            }

            if EXITING.claim().is_err() {
                tracing::warn!("Forcing exit");
                std::process::exit(FORCED_EXIT_CODE);
            }

            tracing::info!("Shutting down. Send ^C to force exit.");
            shutdown.cancel();
        }
    });
}
