// src/peertube/mod.rs

//! PeerTube upload client.
//!
//! The rest of the crate only sees the [`UploadClient`] trait: authenticate
//! once at startup, then one `upload` call per settled file. Production uses
//! [`PeerTubeClient`]; tests plug in a scripted fake.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;

pub mod client;
pub mod model;

pub use client::PeerTubeClient;
pub use model::{UploadedVideo, VideoAttributes};

#[derive(Debug, Error)]
pub enum PeerTubeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context}: {status} - {body}")]
    Status {
        context: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("opening video file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PeerTubeError>> + Send + 'a>>;

/// Remote side of an upload.
pub trait UploadClient: Send + Sync {
    /// Obtain (or refresh) credentials. Used as a startup pre-check.
    fn authenticate(&self) -> ClientFuture<'_, ()>;

    /// Upload the whole file at `path` with the given metadata.
    fn upload<'a>(
        &'a self,
        path: &'a Path,
        attrs: &'a VideoAttributes,
    ) -> ClientFuture<'a, UploadedVideo>;
}
