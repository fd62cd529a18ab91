use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use peertube_monitor::peertube::{
    ClientFuture, PeerTubeError, UploadClient, UploadedVideo, VideoAttributes,
};

/// Scripted answer for one upload call.
#[derive(Debug, Clone)]
pub enum UploadScript {
    Succeed,
    Fail(String),
}

/// A fake PeerTube client that:
/// - records every upload (path + attributes)
/// - answers from a script, then succeeds once the script runs out
/// - can be told to reject authentication
#[derive(Clone, Default)]
pub struct FakeUploadClient {
    script: Arc<Mutex<VecDeque<UploadScript>>>,
    uploads: Arc<Mutex<Vec<(PathBuf, VideoAttributes)>>>,
    auth_calls: Arc<AtomicUsize>,
    reject_auth: Arc<Mutex<Option<String>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeUploadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` uploads with `reason`.
    pub fn failing(n: usize, reason: &str) -> Self {
        let client = Self::new();
        for _ in 0..n {
            client.push(UploadScript::Fail(reason.to_string()));
        }
        client
    }

    pub fn push(&self, step: UploadScript) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn reject_auth(&self, reason: &str) {
        *self.reject_auth.lock().unwrap() = Some(reason.to_string());
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, VideoAttributes)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

impl UploadClient for FakeUploadClient {
    fn authenticate(&self) -> ClientFuture<'_, ()> {
        Box::pin(async move {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            match self.reject_auth.lock().unwrap().clone() {
                Some(reason) => Err(PeerTubeError::Rejected(reason)),
                None => Ok(()),
            }
        })
    }

    fn upload<'a>(
        &'a self,
        path: &'a Path,
        attrs: &'a VideoAttributes,
    ) -> ClientFuture<'a, UploadedVideo> {
        Box::pin(async move {
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_path_buf(), attrs.clone()));

            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(UploadScript::Succeed);

            match step {
                UploadScript::Succeed => {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(UploadedVideo {
                        id,
                        uuid: format!("fake-{id}"),
                        name: attrs.name.clone(),
                    })
                }
                UploadScript::Fail(reason) => Err(PeerTubeError::Rejected(reason)),
            }
        })
    }
}
