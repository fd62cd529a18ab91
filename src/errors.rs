// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Per-file failures (stat, upload, relocation) have their own error types
//! closer to where they happen ([`crate::peertube::PeerTubeError`],
//! [`crate::upload::DispositionError`]); they are logged and never abort the
//! event loop. `MonitorError` covers what can stop the process.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("cannot watch {path:?}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("authentication failed: {0}")]
    Auth(#[from] crate::peertube::PeerTubeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MonitorError>;
