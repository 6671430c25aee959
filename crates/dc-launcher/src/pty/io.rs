//! Async wrappers over the blocking PTY master handles

use std::io::{self, Read, Write};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use dc_core::traits::{ProcessInput, ProcessOutput};

/// Size of each blocking read from the PTY master
const PTY_READ_BUFFER_SIZE: usize = 4096;

/// Chunks buffered between the blocking reader and the outbound relay.
///
/// Small on purpose: when the client stops draining, the reader blocks on
/// the channel instead of accumulating terminal output in memory.
const PTY_OUTPUT_CHANNEL_CAPACITY: usize = 32;

/// Terminal output read by a blocking task
pub struct PtyOutput {
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl PtyOutput {
    /// Start the blocking reader for `reader`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(reader: Box<dyn Read + Send>, label: String) -> Self {
        let (tx, rx) = mpsc::channel(PTY_OUTPUT_CHANNEL_CAPACITY);
        spawn_pty_reader(reader, tx, label);
        Self { rx }
    }
}

#[async_trait]
impl ProcessOutput for PtyOutput {
    async fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// Read the PTY master on the blocking pool until it closes.
///
/// Stops when the terminal closes, on a read error, or when the receiving
/// side has been dropped.
fn spawn_pty_reader(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<io::Result<Bytes>>,
    label: String,
) {
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; PTY_READ_BUFFER_SIZE];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("PTY reader EOF for {}", label);
                    break;
                }
                Ok(n) => {
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if tx.blocking_send(Ok(chunk)).is_err() {
                        tracing::debug!("PTY output receiver dropped for {}", label);
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_terminal_closed(&e) => {
                    tracing::debug!("PTY closed for {}: {}", label, e);
                    break;
                }
                Err(e) => {
                    tracing::warn!("PTY read error for {}: {}", label, e);
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }

        tracing::trace!("PTY reader task exiting for {}", label);
    });
}

/// Linux reports EIO on the master once the slave side has gone away.
fn is_terminal_closed(e: &io::Error) -> bool {
    #[cfg(unix)]
    if e.raw_os_error() == Some(nix::errno::Errno::EIO as i32) {
        return true;
    }
    e.kind() == io::ErrorKind::BrokenPipe
}

/// Terminal input written on the blocking pool
pub struct PtyInput {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl PtyInput {
    /// Wrap the PTY master writer
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl ProcessInput for PtyInput {
    async fn write_all(&mut self, data: Bytes) -> io::Result<()> {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || {
            let mut writer = writer.lock();
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}
