// src/upload/backend.rs

//! Pluggable disposition backend.
//!
//! The runtime hands settled paths to a `DispositionBackend` instead of
//! calling the disposer inline, so an upload that takes minutes never blocks
//! the event loop.
//!
//! - `TaskDispositionBackend` is the production implementation: one Tokio
//!   task per settled file, reporting back with
//!   `RuntimeEvent::DispositionFinished`.
//! - Tests can provide their own backend that records the paths and replies
//!   with canned outcomes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;

use super::disposer::Disposer;

/// Trait abstracting how settled files are handed off for upload.
pub trait DispositionBackend: Send {
    /// Start disposition of `path`. Completion is reported asynchronously
    /// through the runtime channel, not through the returned future.
    fn dispatch(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

pub struct TaskDispositionBackend {
    disposer: Arc<Disposer>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl TaskDispositionBackend {
    pub fn new(disposer: Arc<Disposer>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            disposer,
            runtime_tx,
        }
    }
}

impl DispositionBackend for TaskDispositionBackend {
    fn dispatch(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let disposer = Arc::clone(&self.disposer);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let result = disposer.dispose(&path).await;
                debug!(path = %path.display(), "disposition task finished");
                // Fails only once the runtime has shut down.
                let _ = tx
                    .send(RuntimeEvent::DispositionFinished { path, result })
                    .await;
            });
            Ok(())
        })
    }
}
