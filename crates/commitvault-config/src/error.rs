use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file at the resolved location.
    #[error("configuration file not found at {} (run `commitvault init` to create one)", .0.display())]
    NotFound(PathBuf),

    /// The platform has no user configuration directory.
    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    /// Refused to overwrite an existing file.
    #[error("configuration file already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field holds a value outside its accepted range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error reading or writing the file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
