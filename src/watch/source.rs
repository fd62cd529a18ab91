// src/watch/source.rs

//! Directory event source built on `notify`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::MonitorError;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Written,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Live change feed for one directory (non-recursive).
///
/// Dropping the source closes the underlying OS watch. The feed is not
/// restartable: once [`DirectoryEventSource::next`] returns `None` the watch
/// is gone.
pub struct DirectoryEventSource {
    root: PathBuf,
    _inner: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl std::fmt::Debug for DirectoryEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryEventSource")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl DirectoryEventSource {
    /// Start watching `root`.
    ///
    /// Fails with [`MonitorError::WatchSetup`] if the directory does not exist
    /// or the OS refuses the watch; there is no retry.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, MonitorError> {
        let root = root.into();

        // Channel from the blocking notify callback into the async world.
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let setup_err = |source: notify::Error| MonitorError::WatchSetup {
            path: root.clone(),
            source,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only goes away on shutdown.
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(setup_err)?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(setup_err)?;

        info!(path = %root.display(), "directory watch established");

        Ok(Self {
            root,
            _inner: watcher,
            rx,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Next batch of events from the OS.
    ///
    /// Notify errors are surfaced as `Err` items; the feed keeps going after
    /// them.
    pub async fn next(&mut self) -> Option<Result<Vec<FileEvent>, notify::Error>> {
        let res = self.rx.recv().await?;
        Some(res.map(translate_event))
    }
}

/// Map one notify event onto zero or more [`FileEvent`]s.
pub fn translate_event(event: Event) -> Vec<FileEvent> {
    use FileEventKind::*;

    let kind = match event.kind {
        EventKind::Create(_) => Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            let mut paths = event.paths.into_iter();
            if let Some(from) = paths.next() {
                out.push(FileEvent::new(Removed, from));
            }
            if let Some(to) = paths.next() {
                out.push(FileEvent::new(Created, to));
            }
            return out;
        }
        EventKind::Modify(_) => Written,
        EventKind::Remove(_) => Removed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            debug!(?event, "ignoring notify event");
            return Vec::new();
        }
    };

    event
        .paths
        .into_iter()
        .map(|p| FileEvent::new(kind, p))
        .collect()
}

/// One-shot listing of the regular files already present in `root`,
/// sorted so startup order is deterministic.
pub fn initial_scan(fs: &dyn FileSystem, root: &Path) -> Result<Vec<FileEvent>> {
    let mut files: Vec<PathBuf> = fs
        .read_dir(root)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .collect();
    files.sort();

    Ok(files
        .into_iter()
        .map(|p| FileEvent::new(FileEventKind::Created, p))
        .collect())
}
