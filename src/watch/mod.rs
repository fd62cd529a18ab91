// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which files are videos at all ([`filter`]).
//! - Wiring up a non-recursive directory watch on top of `notify` ([`source`]).
//! - Tracking files until they stop changing ([`settle`]).
//!
//! It does **not** know about PeerTube; it only turns filesystem changes into
//! "this file is ready" decisions for the engine.

pub mod filter;
pub mod settle;
pub mod source;
pub mod watcher;

pub use filter::ExtensionFilter;
pub use settle::{SettleTicket, SettleTracker, SettleVerdict};
pub use source::{DirectoryEventSource, FileEvent, FileEventKind, initial_scan};
pub use watcher::{WatcherHandle, spawn_watcher};
