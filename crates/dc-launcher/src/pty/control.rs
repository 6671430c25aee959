//! Lifecycle control for a PTY-backed process

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use portable_pty::{Child, MasterPty};

use dc_core::error::SessionError;
use dc_core::traits::ProcessControl;
use dc_protocol::TerminalSize;

use super::pty_size;

/// How long a process gets to exit after the close signal before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Interval between exit checks while waiting for the process
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Resize and termination for one PTY child
pub struct PtyControl {
    /// PTY master; dropped on terminate to close the terminal
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    /// Child process; taken out when it is reaped
    child: Mutex<Option<Box<dyn Child + Send + Sync>>>,
    /// Process ID of the child
    pid: Option<u32>,
    /// Signal number delivered on terminate
    close_signal: i32,
}

impl PtyControl {
    /// Take ownership of a spawned child and its PTY master
    pub fn new(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        pid: Option<u32>,
        close_signal: i32,
    ) -> Self {
        Self {
            master: Mutex::new(Some(master)),
            child: Mutex::new(Some(child)),
            pid,
            close_signal,
        }
    }

    /// Deliver the close signal, falling back to a hard kill
    fn signal(&self, child: &mut Box<dyn Child + Send + Sync>) -> Result<(), SessionError> {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let signal = Signal::try_from(self.close_signal).map_err(|e| {
                SessionError::Terminate(format!("signal {}: {}", self.close_signal, e))
            })?;

            return match kill(Pid::from_raw(pid as i32), signal) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(e) => Err(SessionError::Terminate(format!("kill {}: {}", pid, e))),
            };
        }

        child
            .kill()
            .map_err(|e| SessionError::Terminate(e.to_string()))
    }
}

#[async_trait]
impl ProcessControl for PtyControl {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        let master = self.master.lock();
        let master = master
            .as_ref()
            .ok_or_else(|| SessionError::Resize("terminal already closed".to_string()))?;

        tracing::debug!("Resizing PID {:?} to {}x{}", self.pid, size.cols, size.rows);

        master
            .resize(pty_size(size))
            .map_err(|e| SessionError::Resize(format!("{:#}", e)))
    }

    async fn terminate(&self) -> Result<Option<i32>, SessionError> {
        let Some(mut child) = self.child.lock().take() else {
            return Ok(None);
        };

        let already_exited = matches!(child.try_wait(), Ok(Some(_)));
        let signalled = if already_exited {
            true
        } else {
            match self.signal(&mut child) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("PID {:?} could not be signalled: {}", self.pid, e);
                    false
                }
            }
        };

        // Closing the master hangs up the terminal for anything still attached.
        drop(self.master.lock().take());

        if !signalled {
            return kill_and_reap(child, self.pid).await;
        }

        let deadline = Instant::now() + TERMINATE_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.exit_code() as i32;
                    tracing::debug!("PID {:?} exited with code {}", self.pid, code);
                    return Ok(Some(code));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("PID {:?} wait failed: {}", self.pid, e);
                    return kill_and_reap(child, self.pid).await;
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(
                    "PID {:?} ignored signal {} for {:?}, killing",
                    self.pid,
                    self.close_signal,
                    TERMINATE_GRACE
                );
                return kill_and_reap(child, self.pid).await;
            }

            tokio::time::sleep(REAP_POLL_INTERVAL).await;
        }
    }
}

/// Kill the child outright and block (on the blocking pool) until it is reaped
async fn kill_and_reap(
    mut child: Box<dyn Child + Send + Sync>,
    pid: Option<u32>,
) -> Result<Option<i32>, SessionError> {
    if let Err(e) = child.kill() {
        tracing::debug!("PID {:?} kill: {}", pid, e);
    }
    let status = tokio::task::spawn_blocking(move || child.wait())
        .await
        .map_err(|e| SessionError::Terminate(e.to_string()))?
        .map_err(|e| SessionError::Terminate(e.to_string()))?;
    Ok(Some(status.exit_code() as i32))
}
