// src/config/validate.rs

use crate::config::model::{Config, RawConfigFile};
use crate::errors::{MonitorError, Result};

impl TryFrom<RawConfigFile> for Config {
    type Error = crate::errors::MonitorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(Config::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_peertube(cfg)?;
    validate_watcher(cfg)?;
    Ok(())
}

fn validate_peertube(cfg: &RawConfigFile) -> Result<()> {
    let required = [
        ("peertube.url", &cfg.peertube.url),
        ("peertube.username", &cfg.peertube.username),
        ("peertube.password", &cfg.peertube.password),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(MonitorError::ConfigError(format!("{key} is required")));
        }
    }

    if !cfg.peertube.url.starts_with("http://") && !cfg.peertube.url.starts_with("https://") {
        return Err(MonitorError::ConfigError(format!(
            "peertube.url must start with http:// or https:// (got {:?})",
            cfg.peertube.url
        )));
    }

    Ok(())
}

fn validate_watcher(cfg: &RawConfigFile) -> Result<()> {
    let watcher = &cfg.watcher;

    if watcher.watch_path.as_os_str().is_empty() {
        return Err(MonitorError::ConfigError(
            "watcher.watch_path is required".to_string(),
        ));
    }

    if watcher.max_retries == 0 {
        return Err(MonitorError::ConfigError(
            "watcher.max_retries must be >= 1 (got 0)".to_string(),
        ));
    }

    if watcher.settle_time == 0 {
        return Err(MonitorError::ConfigError(
            "watcher.settle_time must be >= 1 second (got 0)".to_string(),
        ));
    }

    if watcher.video_extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
        return Err(MonitorError::ConfigError(
            "watcher.video_extensions must name at least one extension".to_string(),
        ));
    }

    for (key, dir) in [
        ("watcher.done_path", &watcher.done_path),
        ("watcher.failed_path", &watcher.failed_path),
    ] {
        if dir.as_deref() == Some(watcher.watch_path.as_path()) {
            return Err(MonitorError::ConfigError(format!(
                "{key} must differ from watcher.watch_path"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{PeerTubeSection, WatcherSection};
    use std::path::PathBuf;

    fn valid_raw() -> RawConfigFile {
        RawConfigFile {
            peertube: PeerTubeSection {
                url: "https://videos.example.org".to_string(),
                username: "uploader".to_string(),
                password: "hunter2".to_string(),
                ..PeerTubeSection::default()
            },
            watcher: WatcherSection {
                watch_path: PathBuf::from("/srv/incoming"),
                ..WatcherSection::default()
            },
            ..RawConfigFile::default()
        }
    }

    fn config_error(raw: RawConfigFile) -> String {
        match Config::try_from(raw) {
            Err(MonitorError::ConfigError(msg)) => msg,
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn accepts_minimal_config() {
        let cfg = Config::try_from(valid_raw()).unwrap();
        assert_eq!(cfg.watcher.max_retries, 3);
        assert_eq!(cfg.watcher.settle_time, 5);
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut raw = valid_raw();
        raw.peertube.password.clear();
        assert!(config_error(raw).contains("peertube.password"));
    }

    #[test]
    fn rejects_missing_watch_path() {
        let mut raw = valid_raw();
        raw.watcher.watch_path = PathBuf::new();
        assert!(config_error(raw).contains("watch_path"));
    }

    #[test]
    fn rejects_zero_retries() {
        let mut raw = valid_raw();
        raw.watcher.max_retries = 0;
        assert!(config_error(raw).contains("max_retries"));
    }

    #[test]
    fn rejects_done_path_equal_to_watch_path() {
        let mut raw = valid_raw();
        raw.watcher.done_path = Some(PathBuf::from("/srv/incoming"));
        assert!(config_error(raw).contains("done_path"));
    }

    #[test]
    fn rejects_url_without_scheme() {
        let mut raw = valid_raw();
        raw.peertube.url = "videos.example.org".to_string();
        assert!(config_error(raw).contains("http"));
    }
}
