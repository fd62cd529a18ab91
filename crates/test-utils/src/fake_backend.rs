use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use peertube_monitor::engine::RuntimeEvent;
use peertube_monitor::errors::Result;
use peertube_monitor::peertube::UploadedVideo;
use peertube_monitor::upload::{DispositionBackend, DispositionOutcome, FinalLocation};

/// A fake disposition backend that:
/// - records which paths were dispatched (and when, in virtual time)
/// - immediately reports a successful upload for each of them.
pub struct FakeDispositionBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<(PathBuf, tokio::time::Instant)>>>,
}

impl FakeDispositionBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<(PathBuf, tokio::time::Instant)>>>,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
        }
    }
}

impl DispositionBackend for FakeDispositionBackend {
    fn dispatch(&mut self, path: PathBuf) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);

        Box::pin(async move {
            {
                let mut guard = dispatched.lock().unwrap();
                guard.push((path.clone(), tokio::time::Instant::now()));
            }

            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = DispositionOutcome::Success {
                video: UploadedVideo {
                    id: 1,
                    uuid: "fake".to_string(),
                    name,
                },
                location: FinalLocation::Deleted,
            };

            tx.send(RuntimeEvent::DispositionFinished {
                path,
                result: Ok(outcome),
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
