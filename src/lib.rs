// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod peertube;
pub mod upload;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::Config;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::peertube::{PeerTubeClient, UploadClient};
use crate::upload::{DispositionPolicy, Disposer, RetryLedger, TaskDispositionBackend};

const RUNTIME_CHANNEL_CAPACITY: usize = 256;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the PeerTube client (authenticated once up front)
/// - disposer / retry ledger / runtime
/// - the directory watcher, seeded with files already present
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: &CliArgs, cfg: Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting peertube-monitor");
    info!(source = %cfg.credential_source(), "credentials loaded");

    if args.dry_run {
        print_dry_run(&args.config, &cfg);
        return Ok(());
    }

    let client = PeerTubeClient::from_config(&cfg.peertube)?;
    client.authenticate().await?;
    info!(url = %client.base_url(), user = %cfg.peertube.username, "authenticated with PeerTube");

    let policy = DispositionPolicy::from_config(&cfg);
    match &policy.done_dir {
        Some(dir) => info!(dir = %dir.display(), "uploaded files will be moved"),
        None => info!("uploaded files will be deleted"),
    }
    match &policy.failed_dir {
        Some(dir) => info!(dir = %dir.display(), "failed files will be moved"),
        None => info!("failed files will be renamed with a .failed suffix"),
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let ledger = RetryLedger::new();
    let disposer = Arc::new(Disposer::new(
        Arc::new(client),
        Arc::clone(&fs),
        policy,
        cfg.peertube.defaults.clone(),
        ledger.clone(),
    ));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);

    let backend = TaskDispositionBackend::new(disposer, rt_tx.clone());

    let target = cfg.watch_target();
    info!(
        path = %target.path.display(),
        extensions = ?target.extensions.extensions().collect::<Vec<_>>(),
        settle_secs = target.settle_duration.as_secs(),
        max_retries = target.max_retries,
        "monitoring directory"
    );

    let _watcher = crate::watch::spawn_watcher(target.path.clone(), Arc::clone(&fs), rt_tx.clone())?;

    spawn_shutdown_listener(rt_tx.clone());

    let core = CoreRuntime::new(target, fs, ledger);
    let runtime = Runtime::new(core, &rt_tx, rt_rx, backend);
    // The runtime only holds a weak sender; closing ours lets the channel
    // close once the watcher and the signal task are gone.
    drop(rt_tx);

    runtime.run().await?;
    info!("peertube-monitor stopped");
    Ok(())
}

/// Ctrl-C (and SIGTERM on unix) → graceful shutdown.
fn spawn_shutdown_listener(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            eprintln!("failed to listen for shutdown signals: {e}");
            return;
        }
        info!("shutdown signal received");
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Print the effective settings. The password is never shown.
fn print_dry_run(config_path: &Path, cfg: &Config) {
    println!("peertube-monitor dry-run");
    println!("  config file = {}", config_path.display());
    println!();

    let pt = &cfg.peertube;
    println!("peertube:");
    println!("  url = {}", pt.url);
    println!("  username = {}", pt.username);
    println!("  credentials from = {}", cfg.credential_source());
    println!("  timeout_secs = {}", pt.timeout_secs);
    println!("  defaults = {:?}", pt.defaults);
    println!();

    let w = &cfg.watcher;
    println!("watcher:");
    println!("  watch_path = {}", w.watch_path.display());
    match &w.done_path {
        Some(p) => println!("  done_path = {}", p.display()),
        None => println!("  done_path = (delete after upload)"),
    }
    match &w.failed_path {
        Some(p) => println!("  failed_path = {}", p.display()),
        None => println!("  failed_path = (rename with .failed)"),
    }
    println!("  video_extensions = {:?}", cfg.watch_target().extensions.extensions().collect::<Vec<_>>());
    println!("  settle_time = {}s", w.settle_time);
    println!("  max_retries = {}", w.max_retries);

    if let Some(ref log_file) = cfg.logging.log_file {
        println!();
        println!("logging:");
        println!("  log_file = {}", log_file.display());
    }

    debug!("dry-run complete (no upload)");
}

