//! Core error types for docker-console

use std::path::PathBuf;
use thiserror::Error;

/// Failure opening or running a console session
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The init request was rejected
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The shell could not be started
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Transport error on the client connection
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Authentication failures
///
/// The display text of each variant is what the client sees before the
/// connection is closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The init request named no container
    #[error("Parameter is error !")]
    MissingClientId,

    /// The fingerprint does not match the identifiers
    #[error("Auth is not allowed!")]
    FingerprintMismatch,
}

/// Process launch failures
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The identifier cannot name a container
    #[error("Invalid container identifier: {0:?}")]
    InvalidContainer(String),

    /// Pseudo-terminal allocation failed
    #[error("PTY allocation failed: {0}")]
    Pty(String),

    /// The exec command could not be started
    #[error("Failed to start shell in {container}: {reason}")]
    Spawn { container: String, reason: String },
}

/// Failures acting on a running session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Resizing the terminal failed
    #[error("Resize failed: {0}")]
    Resize(String),

    /// Delivering the close signal failed
    #[error("Terminate failed: {0}")]
    Terminate(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
