//! PTY-backed processes
//!
//! Opens a pseudo-terminal with portable-pty, spawns a command on its slave
//! side, and hands the master side out as `dc_core` process handles.

mod control;
mod io;

pub use control::PtyControl;
pub use io::{PtyInput, PtyOutput};

use std::sync::Arc;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};

use dc_core::error::LaunchError;
use dc_core::traits::SpawnedProcess;
use dc_protocol::TerminalSize;

/// Spawn `cmd` on a new pseudo-terminal
///
/// `label` names the process in errors and logs. `close_signal` is the
/// signal number delivered when the process is terminated. Must be called
/// from within a tokio runtime.
pub fn spawn_pty(
    cmd: CommandBuilder,
    size: TerminalSize,
    close_signal: i32,
    label: &str,
) -> Result<SpawnedProcess, LaunchError> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(pty_size(size))
        .map_err(|e| LaunchError::Pty(format!("{:#}", e)))?;

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| LaunchError::Spawn {
            container: label.to_string(),
            reason: format!("{:#}", e),
        })?;

    // The parent must not hold the slave open, or reads on the master never
    // see the end of the terminal when the child exits.
    drop(pair.slave);

    let pid = child.process_id();

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| LaunchError::Pty(format!("Failed to clone PTY reader: {:#}", e)))?;

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| LaunchError::Pty(format!("Failed to take PTY writer: {:#}", e)))?;

    tracing::debug!("Spawned {} on PTY with PID {:?}", label, pid);

    Ok(SpawnedProcess {
        output: Box::new(PtyOutput::spawn(reader, label.to_string())),
        input: Box::new(PtyInput::new(writer)),
        control: Arc::new(PtyControl::new(pair.master, child, pid, close_signal)),
    })
}

pub(crate) fn pty_size(size: TerminalSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
