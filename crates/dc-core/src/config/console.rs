//! Console server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::TerminalPreferences;
use crate::error::ConfigError;

/// Highest standard signal number accepted as `close_signal`
const MAX_CLOSE_SIGNAL: i32 = 31;

/// Configuration for the console server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Address to listen on (empty = all interfaces)
    pub address: String,

    /// Port to listen on
    pub port: u16,

    /// Whether client keystrokes are forwarded to the process
    pub permit_write: bool,

    /// Window title template
    ///
    /// Recognised placeholders: `{container}`, `{hostname}`, `{remote_addr}`, `{pid}`.
    pub title_format: String,

    /// Whether clients are told to reconnect after a disconnect
    pub enable_reconnect: bool,

    /// Delay clients wait before reconnecting
    #[serde(with = "duration_secs")]
    pub reconnect_time: Duration,

    /// Signal number delivered to the process on teardown (1 = SIGHUP)
    pub close_signal: i32,

    /// Session key name, accepted and logged at startup
    pub session_key: String,

    /// Program used to exec into containers
    pub docker_binary: String,

    /// Shell started inside the container
    pub shell: String,

    /// Terminal emulator preferences sent at session start
    pub preferences: TerminalPreferences,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
            permit_write: true,
            title_format: "{container} console".to_string(),
            enable_reconnect: true,
            reconnect_time: Duration::from_secs(10),
            close_signal: 1,
            session_key: "_auth_user_id".to_string(),
            docker_binary: "docker".to_string(),
            shell: "/bin/bash".to_string(),
            preferences: TerminalPreferences::default(),
        }
    }
}

impl ConsoleConfig {
    /// Reject values that would only fail once a session is running
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CLOSE_SIGNAL).contains(&self.close_signal) {
            return Err(ConfigError::Invalid(format!(
                "close_signal must be between 1 and {}, got {}",
                MAX_CLOSE_SIGNAL, self.close_signal
            )));
        }
        if self.shell.is_empty() {
            return Err(ConfigError::Invalid("shell must not be empty".to_string()));
        }
        Ok(())
    }

    /// Get the socket address to bind (`address:port`)
    ///
    /// An empty address listens on all interfaces.
    pub fn listen_address(&self) -> String {
        let host = if self.address.is_empty() {
            "0.0.0.0"
        } else {
            self.address.as_str()
        };

        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}
