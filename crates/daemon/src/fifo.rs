//! Command FIFO reader.

use anyhow::{Context, Result};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use xnotif_ipc::{CommandSource, Order};

/// A named pipe the daemon reads command lines from.
///
/// The pipe is opened read-write, so the stream never reaches end-of-file
/// when the last writer goes away.
#[derive(Debug)]
pub struct CommandFifo {
    path: PathBuf,
    receiver: pipe::Receiver,
}

impl CommandFifo {
    /// Create the FIFO at `path`, replacing any stale file, and open it.
    pub fn create(path: &Path) -> Result<Self> {
        if fs::symlink_metadata(path).is_ok() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale FIFO: {}", path.display()))?;
        }

        mkfifo(path, Mode::from_bits_truncate(0o666))
            .with_context(|| format!("Failed to create FIFO: {}", path.display()))?;

        let receiver = pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(path)
            .with_context(|| format!("Failed to open FIFO: {}", path.display()))?;

        info!("Listening for commands on {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            receiver,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode lines into orders until `token` is cancelled or the order
    /// channel closes, then remove the FIFO.
    pub async fn run(
        self,
        mut source: CommandSource,
        orders: mpsc::Sender<Order>,
        token: CancellationToken,
    ) {
        let CommandFifo { path, receiver } = self;
        let mut lines = BufReader::new(receiver).lines();

        loop {
            let line = tokio::select! {
                _ = token.cancelled() => break,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    let Some(order) = source.decode(&line) else {
                        continue;
                    };
                    debug!("FIFO order: {}", order);
                    if orders.send(order).await.is_err() {
                        debug!("Order channel closed, stopping FIFO reader");
                        break;
                    }
                }
                Ok(None) => {
                    warn!("FIFO reached end of file");
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!("Dropping command that is not valid UTF-8");
                }
                Err(e) => {
                    error!("Failed to read from FIFO: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = fs::remove_file(&path) {
            warn!("Failed to remove FIFO {}: {}", path.display(), e);
        }
        info!("FIFO reader stopped");
    }
}
