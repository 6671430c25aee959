//! Process launcher traits
//!
//! The session bridge only talks to a launched process through these traits,
//! so it never depends on how the process was started (docker exec on a PTY,
//! a container runtime client, a plain subprocess, or a test double).

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use dc_protocol::TerminalSize;

use crate::error::{LaunchError, SessionError};
use crate::types::ContainerId;

/// Readable side of a launched process (its terminal output)
///
/// Read only by the outbound relay.
#[async_trait]
pub trait ProcessOutput: Send {
    /// Read the next chunk of output
    ///
    /// Returns `Ok(None)` once the output has ended, which means the process
    /// has exited or its terminal was closed.
    async fn read_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// Writable side of a launched process (its terminal input)
///
/// Written only by the inbound relay.
#[async_trait]
pub trait ProcessInput: Send {
    /// Write all bytes to the process, in order
    async fn write_all(&mut self, data: Bytes) -> io::Result<()>;
}

/// Lifecycle operations on a launched process
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// OS process identifier, if known
    fn pid(&self) -> Option<u32>;

    /// Propagate a new terminal size to the pseudo-terminal
    fn resize(&self, size: TerminalSize) -> Result<(), SessionError>;

    /// Stop the process and reap it
    ///
    /// Returns the exit code when one is available. Calling this again after
    /// the process has been reaped is a no-op returning `Ok(None)`.
    async fn terminate(&self) -> Result<Option<i32>, SessionError>;
}

/// Handles to a freshly launched process
pub struct SpawnedProcess {
    /// Terminal output
    pub output: Box<dyn ProcessOutput>,
    /// Terminal input
    pub input: Box<dyn ProcessInput>,
    /// Lifecycle control
    pub control: Arc<dyn ProcessControl>,
}

impl SpawnedProcess {
    /// OS process identifier, if known
    pub fn pid(&self) -> Option<u32> {
        self.control.pid()
    }
}

/// Starts an interactive shell for a container
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a shell attached to a pseudo-terminal inside `container`
    async fn launch(&self, container: &ContainerId) -> Result<SpawnedProcess, LaunchError>;
}
