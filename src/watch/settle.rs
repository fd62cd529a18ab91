// src/watch/settle.rs

//! Per-path debounce state machine.
//!
//! The tracker decides *when* a file is ready; it never touches the disk or
//! a clock itself. Callers pass in fresh [`FileStat`]s and are told which
//! settle-check to schedule. Each scheduled check carries a [`SettleTicket`];
//! only the most recently issued ticket for a path is live, so a burst of
//! writes collapses into the single check issued by the last one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fs::FileStat;

/// Identifies one scheduled settle-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SettleTicket(pub u64);

/// A file that has been seen but is not yet known to be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub last_stat: FileStat,
    pub ticket: SettleTicket,
}

/// Result of a settle-check firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleVerdict {
    /// The ticket was superseded or the path is no longer tracked.
    Stale,
    /// The file disappeared; tracking was dropped.
    Vanished,
    /// Size or mtime moved since the check was scheduled; a new check must be
    /// scheduled with the returned ticket.
    Changed(SettleTicket),
    /// Unchanged for a full quiet period. Tracking was dropped and the path
    /// should go to disposition.
    Settled,
}

#[derive(Debug, Default)]
pub struct SettleTracker {
    pending: HashMap<PathBuf, PendingFile>,
    next_ticket: u64,
}

impl SettleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a create/write observation, superseding any earlier check.
    ///
    /// Returns the ticket for the check the caller must schedule.
    pub fn observe(&mut self, path: &Path, stat: FileStat) -> SettleTicket {
        self.next_ticket += 1;
        let ticket = SettleTicket(self.next_ticket);
        self.pending.insert(
            path.to_path_buf(),
            PendingFile {
                path: path.to_path_buf(),
                last_stat: stat,
                ticket,
            },
        );
        ticket
    }

    /// Drop tracking for `path`. Returns the cancelled entry, if any.
    pub fn forget(&mut self, path: &Path) -> Option<PendingFile> {
        self.pending.remove(path)
    }

    /// Evaluate a settle-check that just fired.
    ///
    /// `current` is a fresh stat of the file, `None` if it could not be read.
    pub fn check(
        &mut self,
        path: &Path,
        ticket: SettleTicket,
        current: Option<FileStat>,
    ) -> SettleVerdict {
        match self.pending.get(path) {
            Some(p) if p.ticket == ticket => {}
            _ => return SettleVerdict::Stale,
        }

        let Some(current) = current else {
            self.pending.remove(path);
            return SettleVerdict::Vanished;
        };

        let unchanged = self
            .pending
            .get(path)
            .is_some_and(|p| p.last_stat == current);

        if unchanged {
            self.pending.remove(path);
            SettleVerdict::Settled
        } else {
            SettleVerdict::Changed(self.observe(path, current))
        }
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&PendingFile> {
        self.pending.get(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
