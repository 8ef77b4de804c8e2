//! Notify-based watcher over a fixed set of metadata directories.

use crate::{
    error::{Error, Result},
    events::RawEvent,
};
use futures::Stream;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Directory names that are never watched nor descended into. The object
/// database churns on every fetch and gc; hooks never change on commit.
pub const EXCLUDED_DIRS: &[&str] = &["objects", "hooks"];

/// Recursively list `root` and every directory below it, skipping [`EXCLUDED_DIRS`].
///
/// Unreadable subdirectories are logged and skipped; the number of such failures
/// is returned alongside the list. `root` itself is always first.
pub fn enumerate_watch_dirs(root: &Path) -> (Vec<PathBuf>, usize) {
    let mut dirs = vec![root.to_path_buf()];
    let mut failures = 0;
    collect_subdirs(root, &mut dirs, &mut failures);
    (dirs, failures)
}

fn collect_subdirs(dir: &Path, out: &mut Vec<PathBuf>, failures: &mut usize) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Error reading directory {}: {}", dir.display(), e);
            *failures += 1;
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading directory entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }

        let path = entry.path();
        let excluded = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| EXCLUDED_DIRS.contains(&n));
        if excluded {
            trace!("Skipping excluded directory {}", path.display());
            continue;
        }

        out.push(path.clone());
        collect_subdirs(&path, out, failures);
    }
}

/// Watches a repository metadata tree and forwards qualifying events.
///
/// Dropping the watcher stops notifications and closes the paired [`EventStream`].
pub struct MetadataWatcher {
    /// Underlying OS watcher; must stay alive for events to flow
    _watcher: RecommendedWatcher,
    /// Directories with an active watch
    watched: Vec<PathBuf>,
    /// Directories that could not be read or registered
    failures: usize,
}

impl MetadataWatcher {
    /// Enumerate and watch `root` (typically `<repo>/.git`).
    ///
    /// Fails if `root` is not a directory, the OS watcher cannot be created, or not
    /// a single directory could be registered. Partial failures are logged and
    /// tolerated.
    pub fn start(root: &Path) -> Result<(Self, EventStream)> {
        if !root.is_dir() {
            return Err(Error::InvalidPath(root.to_path_buf()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if let Some(raw) = RawEvent::from_notify(event) {
                        trace!("Metadata event: {} {}", raw.kind.as_str(), raw.path.display());
                        // Receiver gone means the monitor is shutting down.
                        let _ = sender.send(raw);
                    }
                }
                Err(e) => {
                    error!("Watcher error: {}", e);
                }
            },
        )
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        let (candidates, mut failures) = enumerate_watch_dirs(root);
        let mut watched = Vec::with_capacity(candidates.len());

        for dir in candidates {
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!("Added watch on {}", dir.display());
                    watched.push(dir);
                }
                Err(e) => {
                    error!("Failed to add watch on {}: {}", dir.display(), e);
                    failures += 1;
                }
            }
        }

        if watched.is_empty() {
            return Err(Error::NoWatches {
                root: root.to_path_buf(),
                failures,
            });
        }
        if failures > 0 {
            warn!(
                "{} errors occurred adding watches under {}; monitoring might be incomplete",
                failures,
                root.display()
            );
        }

        info!(
            "Watching {} directories under {}",
            watched.len(),
            root.display()
        );

        Ok((
            Self {
                _watcher: watcher,
                watched,
                failures,
            },
            EventStream { receiver },
        ))
    }

    /// Directories with an active watch.
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Number of directories that failed to register.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

/// Lazy, unbounded, non-restartable sequence of raw events.
///
/// Ends once the owning [`MetadataWatcher`] is dropped.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<RawEvent>,
}

impl EventStream {
    /// Build a stream fed by an arbitrary sender. Used to drive the debouncer
    /// from sources other than notify.
    pub fn from_receiver(receiver: mpsc::UnboundedReceiver<RawEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event; `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<RawEvent> {
        self.receiver.recv().await
    }
}

impl Stream for EventStream {
    type Item = RawEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
