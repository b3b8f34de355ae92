//! Append-only frame log.
//!
//! Every frame is written as one line: `< ` for inbound, `> ` for outbound.
//! Writes go through a channel to a background task so the supervisor never
//! blocks on disk.

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn prefix(self) -> &'static str {
        match self {
            Direction::Inbound => "<",
            Direction::Outbound => ">",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WireLog {
    tx: mpsc::UnboundedSender<String>,
}

impl WireLog {
    /// Spawn the writer task for `path`. Must be called inside a tokio runtime.
    pub fn open(path: impl Into<String>) -> Self {
        let path = path.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    warn!(path = %path, error = %e, "wire log disabled");
                    return;
                }
            };

            while let Some(line) = rx.recv().await {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!(path = %path, error = %e, "wire log write failed");
                    break;
                }
            }
            let _ = file.flush().await;
        });

        Self { tx }
    }

    pub fn record(&self, direction: Direction, frame: &str) {
        let line = format!("{} {}\n", direction.prefix(), frame.trim_end());
        let _ = self.tx.send(line);
    }
}
