//! Error types for metadata watching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while setting up or running a watch.
#[derive(Error, Debug)]
pub enum Error {
    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error during directory enumeration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The directory to watch does not exist or is not a directory.
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Enumeration finished without a single watch in place.
    #[error("No watches could be added under {} ({failures} failures)", .root.display())]
    NoWatches {
        /// Metadata root being watched.
        root: PathBuf,
        /// Number of directories that failed to register.
        failures: usize,
    },
}

/// Result type for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert notify errors to our error type.
impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}
