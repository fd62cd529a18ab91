// src/config/mod.rs

//! Configuration loading and validation for peertube-monitor.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply env overrides (`loader.rs`).
//! - Validate required fields and bounds (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    Config, CredentialSource, LoggingSection, PeerTubeSection, RawConfigFile, VideoDefaults,
    WatchTarget, WatcherSection,
};
