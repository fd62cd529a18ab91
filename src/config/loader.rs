// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Config, ENV_PASSWORD, ENV_URL, ENV_USERNAME, RawConfigFile};
use crate::errors::{MonitorError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** apply environment
/// overrides or validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, resolve it and run validation.
///
/// This is the entry point for the rest of the application:
///
/// - Reads TOML (defaults are handled by `serde`).
/// - Lets `PEERTUBE_URL`, `PEERTUBE_USERNAME` and `PEERTUBE_PASSWORD` override
///   the file.
/// - Makes the watch/done/failed directories absolute.
/// - Validates, then creates any of those directories that are missing.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let mut raw = load_from_path(&path)?;
    apply_env_overrides(&mut raw, |key| std::env::var(key).ok());

    let cwd = std::env::current_dir()?;
    absolutize_paths(&mut raw, &cwd);

    let config = Config::try_from(raw)?;
    ensure_directories(&config)?;
    Ok(config)
}

/// Overwrite credentials with non-empty values returned by `lookup`.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let targets = [
        (ENV_URL, &mut raw.peertube.url),
        (ENV_USERNAME, &mut raw.peertube.username),
        (ENV_PASSWORD, &mut raw.peertube.password),
    ];
    for (key, slot) in targets {
        if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
            *slot = value;
        }
    }
}

/// Resolve relative directories against `base`.
pub fn absolutize_paths(raw: &mut RawConfigFile, base: &Path) {
    let watcher = &mut raw.watcher;
    if !watcher.watch_path.as_os_str().is_empty() && watcher.watch_path.is_relative() {
        watcher.watch_path = base.join(&watcher.watch_path);
    }
    for dir in [&mut watcher.done_path, &mut watcher.failed_path] {
        if let Some(p) = dir.as_mut().filter(|p| p.is_relative()) {
            *p = base.join(&*p);
        }
    }
}

fn ensure_directories(cfg: &Config) -> Result<()> {
    let dirs = std::iter::once(&cfg.watcher.watch_path)
        .chain(cfg.watcher.done_path.iter())
        .chain(cfg.watcher.failed_path.iter());

    for dir in dirs {
        fs::create_dir_all(dir).map_err(|err| {
            MonitorError::ConfigError(format!("creating directory {}: {err}", dir.display()))
        })?;
    }
    Ok(())
}

/// Default config location: `peertube-monitor.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("peertube-monitor.toml")
}
