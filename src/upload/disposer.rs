// src/upload/disposer.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, VideoDefaults};
use crate::fs::FileSystem;
use crate::peertube::{PeerTubeError, UploadClient, VideoAttributes};

use super::ledger::RetryLedger;
use super::relocate::{FAILED_SUFFIX, move_into, rename_with_suffix};
use super::{DispositionError, DispositionOutcome, FinalLocation};

/// Where files go after their upload outcome is known.
#[derive(Debug, Clone)]
pub struct DispositionPolicy {
    /// `None` deletes successfully uploaded files.
    pub done_dir: Option<PathBuf>,
    /// `None` renames failed files in place with [`FAILED_SUFFIX`].
    pub failed_dir: Option<PathBuf>,
    pub max_retries: u32,
}

impl DispositionPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            done_dir: cfg.watcher.done_path.clone(),
            failed_dir: cfg.watcher.failed_path.clone(),
            max_retries: cfg.watcher.max_retries,
        }
    }
}

/// Uploads settled files and relocates them according to the outcome.
///
/// Each [`Disposer::dispose`] call is one attempt: it never retries on its
/// own. Below `max_retries` a failed file is left where it is; the next
/// create/write notification for it starts a new attempt.
pub struct Disposer {
    client: Arc<dyn UploadClient>,
    fs: Arc<dyn FileSystem>,
    policy: DispositionPolicy,
    defaults: VideoDefaults,
    ledger: RetryLedger,
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("policy", &self.policy)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl Disposer {
    pub fn new(
        client: Arc<dyn UploadClient>,
        fs: Arc<dyn FileSystem>,
        policy: DispositionPolicy,
        defaults: VideoDefaults,
        ledger: RetryLedger,
    ) -> Self {
        Self {
            client,
            fs,
            policy,
            defaults,
            ledger,
        }
    }

    pub fn ledger(&self) -> &RetryLedger {
        &self.ledger
    }

    /// Run one upload attempt for `path` and dispose of the file.
    ///
    /// Upload failures are not errors here; they come back as
    /// [`DispositionOutcome::RetryableFailure`] or
    /// [`DispositionOutcome::TerminalFailure`]. `Err` means the file could not
    /// be relocated and was left where it was.
    pub async fn dispose(&self, path: &Path) -> Result<DispositionOutcome, DispositionError> {
        info!(path = %path.display(), "starting upload");

        let attrs = VideoAttributes::for_file(path, &self.defaults);
        match self.client.upload(path, &attrs).await {
            Ok(video) => {
                info!(
                    path = %path.display(),
                    name = %video.name,
                    uuid = %video.uuid,
                    "upload successful"
                );
                let location = self.handle_success(path).await?;
                Ok(DispositionOutcome::Success { video, location })
            }
            Err(err) => self.handle_failure(path, err).await,
        }
    }

    async fn handle_success(&self, path: &Path) -> Result<FinalLocation, DispositionError> {
        let location = match self.policy.done_dir.clone() {
            Some(done) => {
                let dest = self
                    .blocking(path, "move to done directory", move |fs, src| {
                        move_into(fs, src, &done)
                    })
                    .await?;
                info!(path = %path.display(), dest = %dest.display(), "moved to done");
                FinalLocation::Moved(dest)
            }
            None => {
                self.blocking(path, "delete", |fs, src| fs.remove_file(src))
                    .await?;
                info!(path = %path.display(), "deleted after upload");
                FinalLocation::Deleted
            }
        };

        self.ledger.clear(path);
        Ok(location)
    }

    async fn handle_failure(
        &self,
        path: &Path,
        err: PeerTubeError,
    ) -> Result<DispositionOutcome, DispositionError> {
        let reason = err.to_string();
        let max_retries = self.policy.max_retries;
        let attempt = self.ledger.record_failure(path);

        if attempt < max_retries {
            warn!(
                path = %path.display(),
                error = %reason,
                attempt,
                max_retries,
                "upload failed; will retry"
            );
            return Ok(DispositionOutcome::RetryableFailure {
                reason,
                attempt,
                max_retries,
            });
        }

        warn!(
            path = %path.display(),
            error = %reason,
            attempt,
            max_retries,
            "upload failed; max retries reached"
        );

        let location = match self.policy.failed_dir.clone() {
            Some(failed) => {
                let dest = self
                    .blocking(path, "move to failed directory", move |fs, src| {
                        move_into(fs, src, &failed)
                    })
                    .await?;
                info!(path = %path.display(), dest = %dest.display(), "moved to failed");
                FinalLocation::Moved(dest)
            }
            None => {
                let dest = self
                    .blocking(path, "rename with failure suffix", |fs, src| {
                        rename_with_suffix(fs, src, FAILED_SUFFIX)
                    })
                    .await?;
                info!(path = %path.display(), dest = %dest.display(), "renamed as failed");
                FinalLocation::Renamed(dest)
            }
        };

        self.ledger.clear(path);
        Ok(DispositionOutcome::TerminalFailure { reason, location })
    }

    /// Run a filesystem operation on the blocking pool; copies of large
    /// videos must not stall the async workers.
    async fn blocking<T, F>(
        &self,
        path: &Path,
        action: &'static str,
        op: F,
    ) -> Result<T, DispositionError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FileSystem, &Path) -> anyhow::Result<T> + Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        let src = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || op(fs.as_ref(), &src)).await?;
        result.map_err(|cause| DispositionError::Relocation {
            path: path.to_path_buf(),
            action,
            cause,
        })
    }
}
