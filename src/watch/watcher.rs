// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::errors::{MonitorError, Result};
use crate::fs::FileSystem;
use crate::watch::source::{DirectoryEventSource, initial_scan};

/// Handle for the directory watcher.
///
/// Owns the task that pumps events into the runtime; the OS watch lives
/// inside that task. Dropping this handle stops file watching.
pub struct WatcherHandle {
    root: PathBuf,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Start watching `root` and forward file events into the runtime.
///
/// The live watch is established first, then the directory is listed, so a
/// file that appears in between is seen at least once. Files found by the
/// listing are sent as `Created` events ahead of any live event.
///
/// Failing to establish the watch or to list the directory is fatal. Errors
/// reported by the watch afterwards are forwarded as
/// `RuntimeEvent::SourceError` and the feed continues.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let mut source = DirectoryEventSource::open(&root)?;

    let existing = initial_scan(fs.as_ref(), &root)
        .with_context(|| format!("listing {}", root.display()))
        .map_err(MonitorError::Other)?;
    if !existing.is_empty() {
        info!(count = existing.len(), "found existing files in watch directory");
    }

    let task = tokio::spawn(async move {
        for event in existing {
            if runtime_tx.send(RuntimeEvent::File(event)).await.is_err() {
                return;
            }
        }

        while let Some(batch) = source.next().await {
            let events: Vec<RuntimeEvent> = match batch {
                Ok(events) => events.into_iter().map(RuntimeEvent::File).collect(),
                Err(err) => vec![RuntimeEvent::SourceError(err.to_string())],
            };
            for event in events {
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime gone; stopping directory watch");
                    return;
                }
            }
        }
        debug!("directory watch closed");
    });

    Ok(WatcherHandle { root, task })
}
