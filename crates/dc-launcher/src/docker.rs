//! Docker exec launcher
//!
//! Runs `docker exec -ti <container> <shell>` on a pseudo-terminal so the
//! shell inside the container sees an interactive terminal.

use async_trait::async_trait;
use portable_pty::CommandBuilder;

use dc_core::config::ConsoleConfig;
use dc_core::error::LaunchError;
use dc_core::traits::{ProcessLauncher, SpawnedProcess};
use dc_core::ContainerId;
use dc_protocol::TerminalSize;

use crate::pty::spawn_pty;

/// Launches container shells through the docker CLI
#[derive(Debug, Clone)]
pub struct DockerExecLauncher {
    /// Program used to exec into containers
    docker_binary: String,
    /// Shell started inside the container
    shell: String,
    /// Signal delivered on terminate
    close_signal: i32,
    /// Environment for the exec client
    env: Vec<(String, String)>,
}

impl DockerExecLauncher {
    /// Create a launcher
    pub fn new(
        docker_binary: impl Into<String>,
        shell: impl Into<String>,
        close_signal: i32,
    ) -> Self {
        Self {
            docker_binary: docker_binary.into(),
            shell: shell.into(),
            close_signal,
            env: vec![("TERM".to_string(), "xterm-256color".to_string())],
        }
    }

    /// Create a launcher from the console configuration
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(&config.docker_binary, &config.shell, config.close_signal)
    }

    /// Arguments passed to the docker binary
    pub fn exec_args(&self, container: &ContainerId) -> Vec<String> {
        vec![
            "exec".to_string(),
            "-ti".to_string(),
            container.as_str().to_string(),
            self.shell.clone(),
        ]
    }

    fn command(&self, container: &ContainerId) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(&self.docker_binary);
        cmd.args(self.exec_args(container));
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

#[async_trait]
impl ProcessLauncher for DockerExecLauncher {
    async fn launch(&self, container: &ContainerId) -> Result<SpawnedProcess, LaunchError> {
        if !container.is_valid_name() {
            return Err(LaunchError::InvalidContainer(container.to_string()));
        }

        let process = spawn_pty(
            self.command(container),
            TerminalSize::default(),
            self.close_signal,
            container.as_str(),
        )?;

        tracing::info!(
            "Shell {} running in container {} with PID {:?}",
            self.shell,
            container,
            process.pid()
        );

        Ok(process)
    }
}
