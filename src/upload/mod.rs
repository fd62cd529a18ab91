// src/upload/mod.rs

//! Upload and disposition of settled files.
//!
//! - [`disposer`] runs one upload attempt per settled file and decides what
//!   happens to the file afterwards.
//! - [`ledger`] counts failed attempts per path.
//! - [`relocate`] moves/renames files without overwriting anything.
//! - [`backend`] is the seam between the runtime loop and the disposer tasks.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::peertube::UploadedVideo;

pub mod backend;
pub mod disposer;
pub mod ledger;
pub mod relocate;

pub use backend::{DispositionBackend, TaskDispositionBackend};
pub use disposer::{DispositionPolicy, Disposer};
pub use ledger::RetryLedger;

/// Where a file ended up after disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalLocation {
    /// Moved into the done/failed directory.
    Moved(PathBuf),
    /// Deleted after a successful upload.
    Deleted,
    /// Renamed in place with the failure suffix.
    Renamed(PathBuf),
}

impl fmt::Display for FinalLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalLocation::Moved(p) => write!(f, "moved to {}", p.display()),
            FinalLocation::Deleted => f.write_str("deleted"),
            FinalLocation::Renamed(p) => write!(f, "renamed to {}", p.display()),
        }
    }
}

/// Result of one disposition pass over a settled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionOutcome {
    Success {
        video: UploadedVideo,
        location: FinalLocation,
    },
    RetryableFailure {
        reason: String,
        attempt: u32,
        max_retries: u32,
    },
    TerminalFailure {
        reason: String,
        location: FinalLocation,
    },
}

/// The upload outcome is known but the file could not be put where it
/// belongs. It stays at its original location for manual intervention.
#[derive(Debug, Error)]
pub enum DispositionError {
    #[error("could not {action} {path:?}: {cause:#}")]
    Relocation {
        path: PathBuf,
        action: &'static str,
        cause: anyhow::Error,
    },

    #[error("relocation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
