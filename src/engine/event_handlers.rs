// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::WatchTarget;
use crate::fs::FileSystem;
use crate::upload::{DispositionError, DispositionOutcome, RetryLedger};
use crate::watch::settle::{SettleTicket, SettleTracker, SettleVerdict};
use crate::watch::source::{FileEvent, FileEventKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Fire `SettleCheckDue { path, ticket }` after `delay`, replacing any
    /// timer already running for `path`.
    ScheduleSettleCheck {
        path: PathBuf,
        ticket: SettleTicket,
        delay: Duration,
    },
    /// Drop the timer running for `path`, if any.
    CancelSettleCheck { path: PathBuf },
    /// Hand a settled file to the disposition backend.
    Dispose { path: PathBuf },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn idle() -> Self {
        Self::continue_with(Vec::new())
    }
}

/// Handle a create/write/remove notification from the directory source.
///
/// - Ineligible paths are ignored.
/// - Create/write: stat the file and (re)schedule its settle-check. A file
///   that cannot be stat'ed is dropped; a file already being disposed of is
///   left alone.
/// - Remove: cancel the pending check and forget the file's retry count.
pub fn handle_file_event(
    tracker: &mut SettleTracker,
    in_flight: &HashSet<PathBuf>,
    ledger: &RetryLedger,
    target: &WatchTarget,
    fs: &dyn FileSystem,
    event: FileEvent,
) -> CoreStep {
    let FileEvent { kind, path } = event;

    if !target.extensions.is_eligible(&path) {
        return CoreStep::idle();
    }

    match kind {
        FileEventKind::Created | FileEventKind::Written => {
            if in_flight.contains(&path) {
                debug!(path = %path.display(), ?kind, "file is being uploaded; ignoring event");
                return CoreStep::idle();
            }
            if kind == FileEventKind::Created && !tracker.is_pending(&path) {
                info!(path = %path.display(), "new file detected");
            }
            CoreStep::continue_with(schedule(tracker, fs, path, target.settle_duration))
        }
        FileEventKind::Removed => {
            let mut commands = Vec::new();
            if tracker.forget(&path).is_some() {
                info!(path = %path.display(), "file removed before processing");
                commands.push(CoreCommand::CancelSettleCheck { path: path.clone() });
            }
            if !in_flight.contains(&path) {
                ledger.clear(&path);
            }
            CoreStep::continue_with(commands)
        }
    }
}

/// Handle a settle-check timer firing.
pub fn handle_settle_check(
    tracker: &mut SettleTracker,
    in_flight: &mut HashSet<PathBuf>,
    fs: &dyn FileSystem,
    settle_duration: Duration,
    path: PathBuf,
    ticket: SettleTicket,
) -> CoreStep {
    if tracker.get(&path).map(|p| p.ticket) != Some(ticket) {
        debug!(path = %path.display(), ?ticket, "stale settle-check; ignoring");
        return CoreStep::idle();
    }

    let current = match fs.stat(&path) {
        Ok(stat) => Some(stat),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "file vanished before settling");
            None
        }
    };

    match tracker.check(&path, ticket, current) {
        SettleVerdict::Stale | SettleVerdict::Vanished => CoreStep::idle(),
        SettleVerdict::Changed(ticket) => {
            debug!(path = %path.display(), "file still changing; rescheduling");
            CoreStep::continue_with(vec![CoreCommand::ScheduleSettleCheck {
                path,
                ticket,
                delay: settle_duration,
            }])
        }
        SettleVerdict::Settled => {
            info!(path = %path.display(), "file settled; processing");
            in_flight.insert(path.clone());
            CoreStep::continue_with(vec![CoreCommand::Dispose { path }])
        }
    }
}

/// Handle a finished disposition task: the path is free to be tracked again.
pub fn handle_disposition_finished(
    in_flight: &mut HashSet<PathBuf>,
    path: PathBuf,
    result: Result<DispositionOutcome, DispositionError>,
) -> CoreStep {
    in_flight.remove(&path);

    match result {
        Ok(DispositionOutcome::Success { video, location }) => {
            info!(
                path = %path.display(),
                uuid = %video.uuid,
                %location,
                "file processed"
            );
        }
        Ok(DispositionOutcome::RetryableFailure {
            reason,
            attempt,
            max_retries,
        }) => {
            warn!(
                path = %path.display(),
                error = %reason,
                attempt,
                max_retries,
                "upload attempt failed; file left in place until it changes again"
            );
        }
        Ok(DispositionOutcome::TerminalFailure { reason, location }) => {
            error!(
                path = %path.display(),
                error = %reason,
                %location,
                "giving up on file"
            );
        }
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "disposition failed; file left for manual intervention"
            );
        }
    }

    CoreStep::idle()
}

fn schedule(
    tracker: &mut SettleTracker,
    fs: &dyn FileSystem,
    path: PathBuf,
    delay: Duration,
) -> Vec<CoreCommand> {
    match fs.stat(&path) {
        Ok(stat) => {
            let ticket = tracker.observe(&path, stat);
            vec![CoreCommand::ScheduleSettleCheck {
                path,
                ticket,
                delay,
            }]
        }
        Err(err) => {
            debug!(path = %path.display(), error = %err, "could not stat file; dropping event");
            Vec::new()
        }
    }
}
