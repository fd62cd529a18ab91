// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the runtime channel
//! - running settle-check timers and feeding them back as events
//! - dispatching settled files to the disposition backend
//! - handling Ctrl+C / shutdown
//!
//! The only IO the core performs is `stat` through the [`FileSystem`] trait,
//! so it can be tested against the in-memory mock without Tokio.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WatchTarget;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_disposition_finished, handle_file_event, handle_settle_check,
};
use crate::fs::FileSystem;
use crate::upload::RetryLedger;
use crate::watch::settle::SettleTracker;

/// Where a path currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPhase {
    /// Not tracked.
    Idle,
    /// Waiting for the file to stop changing.
    Pending,
    /// Handed to the disposer; events for it are ignored until it reports back.
    AwaitingDisposition,
}

/// Pure core runtime state.
///
/// This owns:
/// - the settle tracker (`Pending` paths)
/// - the set of paths currently being uploaded (`AwaitingDisposition`)
/// - a handle on the retry ledger shared with the disposer
///
/// A path is in at most one phase at a time: it leaves the tracker before it
/// enters the in-flight set, and new events are ignored while it is there.
pub struct CoreRuntime {
    target: WatchTarget,
    fs: Arc<dyn FileSystem>,
    tracker: SettleTracker,
    in_flight: HashSet<PathBuf>,
    ledger: RetryLedger,
}

impl fmt::Debug for CoreRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("target", &self.target)
            .field("pending", &self.tracker.len())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl CoreRuntime {
    pub fn new(target: WatchTarget, fs: Arc<dyn FileSystem>, ledger: RetryLedger) -> Self {
        Self {
            target,
            fs,
            tracker: SettleTracker::new(),
            in_flight: HashSet::new(),
            ledger,
        }
    }

    pub fn phase(&self, path: &Path) -> PathPhase {
        if self.in_flight.contains(path) {
            PathPhase::AwaitingDisposition
        } else if self.tracker.is_pending(path) {
            PathPhase::Pending
        } else {
            PathPhase::Idle
        }
    }

    /// Expose whether nothing is pending or in flight (for tests).
    pub fn is_idle(&self) -> bool {
        self.tracker.is_empty() && self.in_flight.is_empty()
    }

    pub fn ledger(&self) -> &RetryLedger {
        &self.ledger
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::File(event) => handle_file_event(
                &mut self.tracker,
                &self.in_flight,
                &self.ledger,
                &self.target,
                self.fs.as_ref(),
                event,
            ),
            RuntimeEvent::SourceError(msg) => {
                tracing::warn!(error = %msg, "directory watch error");
                CoreStep::idle()
            }
            RuntimeEvent::SettleCheckDue { path, ticket } => handle_settle_check(
                &mut self.tracker,
                &mut self.in_flight,
                self.fs.as_ref(),
                self.target.settle_duration,
                path,
                ticket,
            ),
            RuntimeEvent::DispositionFinished { path, result } => {
                handle_disposition_finished(&mut self.in_flight, path, result)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CoreCommand;
    use crate::fs::mock::MockFileSystem;
    use crate::peertube::UploadedVideo;
    use crate::upload::{DispositionOutcome, FinalLocation};
    use crate::watch::filter::ExtensionFilter;
    use crate::watch::settle::SettleTicket;
    use crate::watch::source::{FileEvent, FileEventKind};
    use std::time::Duration;

    const SETTLE: Duration = Duration::from_secs(5);

    fn core(fs: &MockFileSystem) -> CoreRuntime {
        let target = WatchTarget {
            path: PathBuf::from("/in"),
            extensions: ExtensionFilter::new([".mp4"]),
            settle_duration: SETTLE,
            max_retries: 3,
        };
        CoreRuntime::new(target, Arc::new(fs.clone()), RetryLedger::new())
    }

    fn file(kind: FileEventKind, path: &str) -> RuntimeEvent {
        RuntimeEvent::File(FileEvent::new(kind, path))
    }

    fn scheduled_ticket(step: &CoreStep) -> SettleTicket {
        match step.commands.as_slice() {
            [CoreCommand::ScheduleSettleCheck { ticket, delay, .. }] => {
                assert_eq!(*delay, SETTLE);
                *ticket
            }
            other => panic!("expected a single ScheduleSettleCheck, got {other:?}"),
        }
    }

    fn due(path: &str, ticket: SettleTicket) -> RuntimeEvent {
        RuntimeEvent::SettleCheckDue {
            path: PathBuf::from(path),
            ticket,
        }
    }

    #[test]
    fn ignores_ineligible_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/notes.txt", b"x".to_vec());
        let mut core = core(&fs);

        let step = core.step(file(FileEventKind::Created, "/in/notes.txt"));
        assert!(step.commands.is_empty());
        assert!(step.keep_running);
        assert!(core.is_idle());
    }

    #[test]
    fn unchanged_file_is_dispatched_after_check() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"data".to_vec());
        let mut core = core(&fs);

        let ticket = scheduled_ticket(&core.step(file(FileEventKind::Created, "/in/clip.mp4")));
        assert_eq!(core.phase(Path::new("/in/clip.mp4")), PathPhase::Pending);

        let step = core.step(due("/in/clip.mp4", ticket));
        assert_eq!(
            step.commands,
            vec![CoreCommand::Dispose {
                path: PathBuf::from("/in/clip.mp4")
            }]
        );
        assert_eq!(
            core.phase(Path::new("/in/clip.mp4")),
            PathPhase::AwaitingDisposition
        );
    }

    #[test]
    fn burst_of_writes_leaves_one_live_check() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"a".to_vec());
        let mut core = core(&fs);

        let mut tickets = vec![scheduled_ticket(
            &core.step(file(FileEventKind::Created, "/in/clip.mp4")),
        )];
        for _ in 0..4 {
            fs.append("/in/clip.mp4", b"more");
            tickets.push(scheduled_ticket(
                &core.step(file(FileEventKind::Written, "/in/clip.mp4")),
            ));
        }

        let (last, stale) = tickets.split_last().unwrap();
        for t in stale {
            assert!(core.step(due("/in/clip.mp4", *t)).commands.is_empty());
        }
        let step = core.step(due("/in/clip.mp4", *last));
        assert!(matches!(step.commands.as_slice(), [CoreCommand::Dispose { .. }]));
    }

    #[test]
    fn change_during_quiet_period_reschedules() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"a".to_vec());
        let mut core = core(&fs);

        let ticket = scheduled_ticket(&core.step(file(FileEventKind::Created, "/in/clip.mp4")));
        // Written without a notification reaching us.
        fs.append("/in/clip.mp4", b"b");

        let next = scheduled_ticket(&core.step(due("/in/clip.mp4", ticket)));
        assert_ne!(next, ticket);
        assert_eq!(core.phase(Path::new("/in/clip.mp4")), PathPhase::Pending);

        let step = core.step(due("/in/clip.mp4", next));
        assert!(matches!(step.commands.as_slice(), [CoreCommand::Dispose { .. }]));
    }

    #[test]
    fn remove_before_settling_cancels() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"a".to_vec());
        let mut core = core(&fs);

        let ticket = scheduled_ticket(&core.step(file(FileEventKind::Created, "/in/clip.mp4")));
        fs.remove("/in/clip.mp4");
        let step = core.step(file(FileEventKind::Removed, "/in/clip.mp4"));
        assert_eq!(
            step.commands,
            vec![CoreCommand::CancelSettleCheck {
                path: PathBuf::from("/in/clip.mp4")
            }]
        );

        assert!(core.step(due("/in/clip.mp4", ticket)).commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn unstatable_file_is_dropped() {
        let fs = MockFileSystem::new();
        let mut core = core(&fs);

        let step = core.step(file(FileEventKind::Created, "/in/ghost.mp4"));
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn vanished_file_is_forgotten_at_check_time() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"a".to_vec());
        let mut core = core(&fs);

        let ticket = scheduled_ticket(&core.step(file(FileEventKind::Created, "/in/clip.mp4")));
        fs.remove("/in/clip.mp4");
        assert!(core.step(due("/in/clip.mp4", ticket)).commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn events_for_in_flight_path_are_ignored_until_finished() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/clip.mp4", b"a".to_vec());
        let mut core = core(&fs);

        let ticket = scheduled_ticket(&core.step(file(FileEventKind::Created, "/in/clip.mp4")));
        core.step(due("/in/clip.mp4", ticket));

        assert!(core.step(file(FileEventKind::Written, "/in/clip.mp4")).commands.is_empty());

        core.step(RuntimeEvent::DispositionFinished {
            path: PathBuf::from("/in/clip.mp4"),
            result: Ok(DispositionOutcome::Success {
                video: UploadedVideo {
                    id: 7,
                    uuid: "abc".to_string(),
                    name: "clip".to_string(),
                },
                location: FinalLocation::Deleted,
            }),
        });
        assert_eq!(core.phase(Path::new("/in/clip.mp4")), PathPhase::Idle);

        scheduled_ticket(&core.step(file(FileEventKind::Written, "/in/clip.mp4")));
    }

    #[test]
    fn remove_clears_retry_count() {
        let fs = MockFileSystem::new();
        let mut core = core(&fs);
        core.ledger().record_failure(Path::new("/in/clip.mp4"));

        core.step(file(FileEventKind::Removed, "/in/clip.mp4"));
        assert_eq!(core.ledger().count(Path::new("/in/clip.mp4")), 0);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let fs = MockFileSystem::new();
        let mut core = core(&fs);
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
