use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EventsOutConfig;

#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.send(line).await.is_err() {
            // writer closed
        }
    }
}

impl std::fmt::Debug for EventsOutTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsOutTx")
            .field("dropped", &self.dropped_count())
            .field("drop_when_full", &self.drop_when_full)
            .finish()
    }
}

/// Spawn the writer task. Returns `None` when the mirror is disabled.
///
/// The writer exits once every [`EventsOutTx`] clone is dropped; await the handle to be sure
/// the file has been flushed.
pub async fn start_events_out(
    cfg: &EventsOutConfig,
) -> anyhow::Result<Option<(EventsOutTx, JoinHandle<()>)>> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if cfg.path == "stdout:" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open events_out '{}': {e}", cfg.path))?;
        Box::new(file)
    };

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let path = cfg.path.clone();

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::warn!(path = %path, error = %e, "events_out writer stopped");
                return;
            }
        }
        let _ = writer.flush().await;
    });

    Ok(Some((
        EventsOutTx {
            tx,
            dropped,
            drop_when_full: cfg.drop_when_full,
        },
        handle,
    )))
}
