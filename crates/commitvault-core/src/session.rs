//! Per-process repository session and commit tracking.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Result of comparing HEAD with the tracked commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// HEAD is the commit already tracked.
    Unchanged,
    /// HEAD reads empty while a commit is tracked. Treated as a transient glitch.
    EmptyHead,
    /// HEAD moved; the tracker now points at the new commit.
    Advanced {
        /// Commit tracked before the move (empty if none).
        previous: String,
    },
}

/// Repository being monitored plus the last commit the processor acted on.
///
/// An empty `last_known_commit` means nothing has been seen yet (fresh repository
/// or unreadable HEAD at startup).
#[derive(Debug)]
pub struct RepositorySession {
    repo_path: PathBuf,
    last_known_commit: Mutex<String>,
}

impl RepositorySession {
    /// Start a session seeded with `initial_commit` (may be empty).
    pub fn new(repo_path: impl Into<PathBuf>, initial_commit: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            last_known_commit: Mutex::new(initial_commit.into()),
        }
    }

    /// Working tree root.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Commit currently tracked.
    pub fn last_known_commit(&self) -> String {
        self.last_known_commit.lock().clone()
    }

    /// Compare `current` with the tracked commit and advance on a real move.
    ///
    /// The advance happens before the caller has done anything with the commit;
    /// use [`rollback`](Self::rollback) if the follow-up cannot even start.
    pub fn observe(&self, current: &str) -> Transition {
        let mut tracked = self.last_known_commit.lock();
        if current == tracked.as_str() {
            return Transition::Unchanged;
        }
        if current.is_empty() {
            return Transition::EmptyHead;
        }
        let previous = std::mem::replace(&mut *tracked, current.to_string());
        Transition::Advanced { previous }
    }

    /// Restore the tracked commit after a failed advance.
    pub fn rollback(&self, previous: String) {
        *self.last_known_commit.lock() = previous;
    }
}
