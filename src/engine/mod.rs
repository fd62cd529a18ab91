// src/engine/mod.rs

//! Orchestration engine for peertube-monitor.
//!
//! This module ties together:
//! - the settle tracker (debounce of incoming files)
//! - the retry ledger (shared with the disposer)
//! - the main runtime event loop that reacts to:
//!   - directory events
//!   - settle-check timers firing
//!   - disposition tasks finishing
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::upload::{DispositionError, DispositionOutcome};
use crate::watch::settle::SettleTicket;
use crate::watch::source::FileEvent;

/// Events flowing into the runtime from the watcher, timers and disposers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// Something happened to a file in the watched directory.
    File(FileEvent),
    /// The underlying watch reported an error; the feed continues.
    SourceError(String),
    /// A previously scheduled settle-check is due.
    SettleCheckDue { path: PathBuf, ticket: SettleTicket },
    /// A disposition task ran to completion.
    DispositionFinished {
        path: PathBuf,
        result: Result<DispositionOutcome, DispositionError>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::{CoreRuntime, PathPhase};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
