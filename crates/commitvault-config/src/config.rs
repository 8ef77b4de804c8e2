use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Working tree of the repository to monitor.
    #[serde(default)]
    pub repository_path: PathBuf,

    /// Quiet interval, in seconds, before a burst of metadata events settles.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,

    /// Git executable used for repository queries and archives.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Object store destination.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Archive pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// S3-compatible destination settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupConfig {
    /// Bucket receiving snapshots.
    pub s3_bucket: String,

    /// Custom endpoint (Wasabi, MinIO, ...). Empty means the AWS default.
    pub s3_endpoint_url: String,

    /// Region used for request signing.
    pub aws_region: String,

    /// Optional key prefix ("folder") inside the bucket.
    pub s3_prefix: String,

    /// Static access key. Leave empty to use the standard AWS credential chain.
    pub aws_access_key_id: String,

    /// Static secret key. Leave empty to use the standard AWS credential chain.
    pub aws_secret_key: String,
}

impl BackupConfig {
    /// Static credentials, when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        if self.aws_access_key_id.is_empty() || self.aws_secret_key.is_empty() {
            None
        } else {
            Some((&self.aws_access_key_id, &self.aws_secret_key))
        }
    }

    /// Prefix with surrounding slashes removed, `None` when nothing is left.
    pub fn normalized_prefix(&self) -> Option<&str> {
        let trimmed = self.s3_prefix.trim_matches('/');
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Archive pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Compressed chunks buffered between compression and upload.
    pub channel_capacity: usize,

    /// Bytes requested from the archive source per read.
    pub chunk_size: usize,

    /// Gzip level, 0 (store) to 9 (best).
    pub compression_level: u32,

    /// Upper bound on one pipeline run in seconds. 0 disables the limit.
    pub timeout_secs: u64,
}

impl PipelineConfig {
    /// Run timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            chunk_size: 64 * 1024,
            compression_level: 6,
            timeout_secs: 0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive (`info`, `debug`, ...).
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_path: PathBuf::new(),
            debounce_seconds: default_debounce_seconds(),
            git_binary: default_git_binary(),
            backup: BackupConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_debounce_seconds() -> u64 {
    2
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Config {
    /// Debounce quiet interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_seconds)
    }

    /// Path of the repository metadata directory.
    pub fn git_dir(&self) -> PathBuf {
        self.repository_path.join(".git")
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.repository_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("repository_path"));
        }
        if self.backup.s3_bucket.trim().is_empty() {
            return Err(ConfigError::MissingField("backup.s3_bucket"));
        }
        if self.debounce_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounce_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.git_binary.trim().is_empty() {
            return Err(ConfigError::MissingField("git_binary"));
        }
        let has_key = !self.backup.aws_access_key_id.is_empty();
        let has_secret = !self.backup.aws_secret_key.is_empty();
        if has_key != has_secret {
            return Err(ConfigError::InvalidValue {
                field: "backup.aws_access_key_id",
                reason: "access key id and secret key must be set together".to_string(),
            });
        }
        if self.pipeline.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pipeline.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pipeline.compression_level > 9 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.compression_level",
                reason: format!("{} is outside 0..=9", self.pipeline.compression_level),
            });
        }
        Ok(())
    }
}
