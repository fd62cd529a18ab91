// src/config/model.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::watch::filter::ExtensionFilter;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [peertube]
/// url = "https://videos.example.org"
/// username = "uploader"
/// password = "secret"
///
/// [peertube.defaults]
/// privacy = 1
/// tags = ["lecture"]
///
/// [watcher]
/// watch_path = "./incoming"
/// done_path = "./done"
/// settle_time = 5
///
/// [logging]
/// verbose = false
/// ```
///
/// This is the unchecked form; [`Config`] is obtained through `TryFrom`,
/// which runs validation.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub peertube: PeerTubeSection,

    #[serde(default)]
    pub watcher: WatcherSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[peertube]` section: server location and credentials.
#[derive(Clone, Deserialize)]
pub struct PeerTubeSection {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Whole-request timeout for the HTTP client, in seconds.
    ///
    /// Uploads of large files can legitimately take many minutes.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Metadata applied to every uploaded video.
    #[serde(default)]
    pub defaults: VideoDefaults,
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

impl Default for PeerTubeSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            defaults: VideoDefaults::default(),
        }
    }
}

// Keep the password out of logs and `--dry-run` output.
impl fmt::Debug for PeerTubeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerTubeSection")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// `[peertube.defaults]` section.
///
/// The numeric ids (category, licence, privacy) are PeerTube's own
/// enumerations and are passed through verbatim.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct VideoDefaults {
    #[serde(default)]
    pub category: u32,
    #[serde(default)]
    pub licence: u32,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub privacy: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub download_enabled: bool,
    #[serde(default)]
    pub comments_enabled: bool,
    #[serde(default)]
    pub wait_transcoding: bool,
    #[serde(default)]
    pub nsfw: bool,
}

/// `[watcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherSection {
    /// Directory to monitor (not recursive).
    #[serde(default)]
    pub watch_path: PathBuf,

    /// Where uploaded files go. `None` deletes them after a successful upload.
    #[serde(default, deserialize_with = "blank_path_as_none")]
    pub done_path: Option<PathBuf>,

    /// Where files go once retries are exhausted. `None` renames them in place
    /// with a `.failed` suffix.
    #[serde(default, deserialize_with = "blank_path_as_none")]
    pub failed_path: Option<PathBuf>,

    /// An empty list means the defaults.
    #[serde(
        default = "default_video_extensions",
        deserialize_with = "extensions_or_default"
    )]
    pub video_extensions: Vec<String>,

    /// Quiet period in seconds before a file counts as fully written.
    #[serde(default = "default_settle_time")]
    pub settle_time: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_video_extensions() -> Vec<String> {
    [".mp4", ".webm", ".mkv", ".avi", ".mov", ".flv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// `done_path = ""` means the same as leaving the key out.
fn blank_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from))
}

fn extensions_or_default<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let exts = Vec::<String>::deserialize(deserializer)?;
    if exts.is_empty() {
        Ok(default_video_extensions())
    } else {
        Ok(exts)
    }
}

fn default_settle_time() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            watch_path: PathBuf::new(),
            done_path: None,
            failed_path: None,
            video_extensions: default_video_extensions(),
            settle_time: default_settle_time(),
            max_retries: default_max_retries(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSection {
    /// Append log lines to this file instead of writing to stderr.
    #[serde(default, deserialize_with = "blank_path_as_none")]
    pub log_file: Option<PathBuf>,

    /// Include source file and line numbers, and default to `debug`.
    #[serde(default)]
    pub verbose: bool,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on required fields being present.
#[derive(Debug, Clone)]
pub struct Config {
    pub peertube: PeerTubeSection,
    pub watcher: WatcherSection,
    pub logging: LoggingSection,
}

impl Config {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            peertube: raw.peertube,
            watcher: raw.watcher,
            logging: raw.logging,
        }
    }

    /// The immutable watch parameters handed to the watcher and the core.
    pub fn watch_target(&self) -> WatchTarget {
        WatchTarget {
            path: self.watcher.watch_path.clone(),
            extensions: ExtensionFilter::new(&self.watcher.video_extensions),
            settle_duration: Duration::from_secs(self.watcher.settle_time),
            max_retries: self.watcher.max_retries,
        }
    }

    /// Report where the credentials came from, for the startup log line.
    pub fn credential_source(&self) -> CredentialSource {
        let from_env = |key: &str| std::env::var(key).is_ok_and(|v| !v.is_empty());
        CredentialSource::detect(from_env(ENV_USERNAME), from_env(ENV_PASSWORD))
    }
}

pub const ENV_URL: &str = "PEERTUBE_URL";
pub const ENV_USERNAME: &str = "PEERTUBE_USERNAME";
pub const ENV_PASSWORD: &str = "PEERTUBE_PASSWORD";

/// What the monitor watches and how patient it is.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub extensions: ExtensionFilter,
    pub settle_duration: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    ConfigFile,
    Environment,
    Mixed,
}

impl CredentialSource {
    pub fn detect(username_from_env: bool, password_from_env: bool) -> Self {
        match (username_from_env, password_from_env) {
            (true, true) => CredentialSource::Environment,
            (false, false) => CredentialSource::ConfigFile,
            _ => CredentialSource::Mixed,
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialSource::ConfigFile => "config file",
            CredentialSource::Environment => "environment variables",
            CredentialSource::Mixed => "mixed (config file + environment variables)",
        };
        f.write_str(s)
    }
}
