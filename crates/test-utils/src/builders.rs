#![allow(dead_code)]

use std::path::{Path, PathBuf};

use peertube_monitor::config::{Config, RawConfigFile, VideoDefaults};
use peertube_monitor::errors::Result;

/// Builder for `Config` to simplify test setup.
///
/// Starts from a valid configuration pointing at a local server and an
/// `incoming` directory; override what the test cares about.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(watch_path: impl Into<PathBuf>) -> Self {
        let mut config = RawConfigFile::default();
        config.peertube.url = "http://127.0.0.1:9000".to_string();
        config.peertube.username = "uploader".to_string();
        config.peertube.password = "secret".to_string();
        config.watcher.watch_path = watch_path.into();
        Self { config }
    }

    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join("incoming"))
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.peertube.url = url.to_string();
        self
    }

    pub fn with_done_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.watcher.done_path = Some(path.into());
        self
    }

    pub fn with_failed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.watcher.failed_path = Some(path.into());
        self
    }

    pub fn with_extensions(mut self, exts: &[&str]) -> Self {
        self.config.watcher.video_extensions = exts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_settle_time(mut self, secs: u64) -> Self {
        self.config.watcher.settle_time = secs;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.config.watcher.max_retries = n;
        self
    }

    pub fn with_defaults(mut self, defaults: VideoDefaults) -> Self {
        self.config.peertube.defaults = defaults;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    /// Validate into a `Config`. Does not create any directories.
    pub fn try_build(self) -> Result<Config> {
        Config::try_from(self.config)
    }

    pub fn build(self) -> Config {
        self.try_build().expect("ConfigBuilder produced an invalid config")
    }
}
