//! Collaborator contracts consumed by the processor and the archive pipeline.

use crate::channel::ByteReceiver;
use crate::error::{RepoError, StoreError};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncRead;

/// Read access to the monitored repository.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Commit id HEAD currently resolves to.
    async fn current_commit_id(&self, repo_path: &Path) -> Result<String, RepoError>;

    /// Paths changed by `commit`, in the order reported. Renames and copies yield
    /// the destination path; deletions are excluded.
    async fn changed_files(&self, repo_path: &Path, commit: &str) -> Result<Vec<String>, RepoError>;

    /// Start producing a tar stream of `commit`'s tree.
    async fn archive_stream(&self, repo_path: &Path, commit: &str)
        -> Result<ArchiveSource, RepoError>;

    /// Whether `file` (relative to the working tree) is in the index.
    async fn is_tracked(&self, repo_path: &Path, file: &str) -> bool;
}

/// A running archive producer: its output stream plus a handle on the process.
pub struct ArchiveSource {
    /// Raw archive bytes.
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Process producing `reader`.
    pub process: Box<dyn SourceProcess>,
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource").finish_non_exhaustive()
    }
}

/// Lifetime handle of the process behind an [`ArchiveSource`].
#[async_trait]
pub trait SourceProcess: Send {
    /// Wait for exit; non-zero exits are reported as errors.
    async fn wait(&mut self) -> Result<(), RepoError>;

    /// Terminate the process. Callers still `wait` afterwards to reap it.
    async fn kill(&mut self) -> Result<(), RepoError>;
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Human-readable violations, in discovery order.
    pub violations: Vec<String>,
}

impl ValidationReport {
    /// A report with no violations.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A report carrying the given violations.
    pub fn with_violations(violations: Vec<String>) -> Self {
        Self { violations }
    }

    /// True when nothing was violated.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Structural policy applied to a commit's changed paths.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Check `changed_files` (and any repository-wide requirements).
    async fn validate(&self, repo_path: &Path, changed_files: &[String]) -> ValidationReport;
}

/// Remote object storage accepting streamed uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `body` to `bucket`/`key` as one continuous operation, consuming the
    /// stream until it ends. Returns the number of bytes stored.
    ///
    /// `body` is dropped before returning on every path, which releases the
    /// producer side of the channel.
    async fn put(&self, bucket: &str, key: &str, body: ByteReceiver) -> Result<u64, StoreError>;
}
