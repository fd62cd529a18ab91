// src/logging.rs

//! Logging setup for `peertube-monitor` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PEERTUBE_MONITOR_LOG` environment variable (e.g. "info", "debug")
//! 3. `debug` when `[logging] verbose = true`, otherwise `info`
//!
//! Logs go to STDERR, or are appended to `[logging] log_file` when set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::config::LoggingSection;

pub const LOG_ENV: &str = "PEERTUBE_MONITOR_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, cfg: &LoggingSection) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = resolve_level(cli_level, env_level.as_deref(), cfg.verbose);

    let builder = fmt()
        .with_max_level(level)
        .with_target(cfg.verbose)
        .with_file(cfg.verbose)
        .with_line_number(cfg.verbose)
        .with_thread_ids(false)
        .with_thread_names(false);

    match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

fn resolve_level(cli: Option<LogLevel>, env: Option<&str>, verbose: bool) -> tracing::Level {
    if let Some(lvl) = cli {
        return level_from_log_level(lvl);
    }
    if let Some(lvl) = env.and_then(parse_level_str) {
        return lvl;
    }
    if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn cli_wins_over_env_and_verbose() {
        assert_eq!(resolve_level(Some(LogLevel::Warn), Some("trace"), true), Level::WARN);
    }

    #[test]
    fn env_wins_over_verbose() {
        assert_eq!(resolve_level(None, Some(" ERROR "), true), Level::ERROR);
    }

    #[test]
    fn unparseable_env_falls_through() {
        assert_eq!(resolve_level(None, Some("chatty"), false), Level::INFO);
        assert_eq!(resolve_level(None, Some("chatty"), true), Level::DEBUG);
    }
}
