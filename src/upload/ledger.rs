// src/upload/ledger.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-path count of failed upload attempts.
///
/// Cloning yields another handle to the same table. Entries never expire;
/// they are removed on terminal outcomes or when the file is deleted.
#[derive(Debug, Clone, Default)]
pub struct RetryLedger {
    attempts: Arc<Mutex<HashMap<PathBuf, u32>>>,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more failure for `path` and return the new total.
    pub fn record_failure(&self, path: &Path) -> u32 {
        let mut table = self.table();
        let count = table.entry(path.to_path_buf()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn clear(&self, path: &Path) {
        self.table().remove(path);
    }

    pub fn count(&self, path: &Path) -> u32 {
        self.table().get(path).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    // A panic while holding the lock cannot leave a counter half-written.
    fn table(&self) -> MutexGuard<'_, HashMap<PathBuf, u32>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
