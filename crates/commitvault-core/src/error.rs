//! Error types for the commit processing core.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`RepositoryClient`](crate::RepositoryClient).
#[derive(Debug, Error)]
pub enum RepoError {
    /// The command could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line, for diagnostics.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        /// Command line, for diagnostics.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The command's output could not be interpreted.
    #[error("unexpected output from `{command}`: {detail}")]
    Parse {
        /// Command line, for diagnostics.
        command: String,
        /// What was wrong with the output.
        detail: String,
    },

    /// IO error reading repository metadata.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store client could not be constructed.
    #[error("object store client error: {0}")]
    Client(String),

    /// The store is not configured for the requested bucket.
    #[error("bucket '{0}' is not served by this store")]
    UnknownBucket(String),

    /// The remote rejected or failed the upload.
    #[error("upload of {key} failed: {source}")]
    Upload {
        /// Object key.
        key: String,
        /// Underlying store error.
        #[source]
        source: object_store::Error,
    },

    /// The byte stream feeding the upload failed.
    #[error("input stream for {key} failed: {source}")]
    Stream {
        /// Object key.
        key: String,
        /// Error observed on the stream.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from one archive pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The archive source could not be started.
    #[error("failed to start archive source: {0}")]
    SourceStart(#[source] RepoError),

    /// The upload failed. Primary error whenever the sink fails.
    #[error("failed to upload {key}: {source}")]
    Upload {
        /// Object key.
        key: String,
        /// Sink error.
        #[source]
        source: StoreError,
    },

    /// The compression stage failed although the sink accepted the stream.
    #[error("compression of {key} failed: {reason}")]
    Transform {
        /// Object key.
        key: String,
        /// Failure description.
        reason: String,
    },

    /// The source process exited unsuccessfully; the upload was aborted.
    #[error("archive source for {key} failed: {source}")]
    SourceFailed {
        /// Object key.
        key: String,
        /// Source process error.
        #[source]
        source: RepoError,
    },

    /// The run exceeded the configured time limit.
    #[error("backup of {key} timed out after {after:?}")]
    TimedOut {
        /// Object key.
        key: String,
        /// Configured limit.
        after: Duration,
    },
}

/// Startup-fatal monitor errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The repository has no metadata directory.
    #[error("'.git' directory not found in {}", .0.display())]
    NotARepository(PathBuf),

    /// The metadata watcher could not be started.
    #[error(transparent)]
    Watch(#[from] commitvault_watch::Error),
}

/// Result type for pipeline runs.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
