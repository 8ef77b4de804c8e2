//! Raw change events emitted by the metadata watcher.

use chrono::{DateTime, Utc};
use notify::event::ModifyKind;
use notify::EventKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kinds of change that count as repository activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    /// File content was written.
    Write,
    /// File or directory was created.
    Create,
    /// File or directory was renamed (git's lockfile commit step).
    Rename,
}

impl RawEventKind {
    /// Map a notify event kind, dropping kinds that never indicate a commit
    /// (attribute changes, access, removals).
    pub fn classify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Write),
            EventKind::Access(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Create => "create",
            Self::Rename => "rename",
        }
    }
}

/// A single qualifying change under the metadata tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    /// Kind of change.
    pub kind: RawEventKind,

    /// Affected path. For renames this is the destination when notify reports both ends.
    pub path: PathBuf,

    /// When the event was received.
    pub timestamp: DateTime<Utc>,
}

impl RawEvent {
    /// Create a new raw event stamped with the current time.
    pub fn new(kind: RawEventKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            timestamp: Utc::now(),
        }
    }

    /// Convert a notify event, returning `None` for non-qualifying kinds.
    pub fn from_notify(event: notify::Event) -> Option<Self> {
        let kind = RawEventKind::classify(&event.kind)?;
        let path = event.paths.into_iter().last().unwrap_or_default();
        Some(Self::new(kind, path))
    }
}
