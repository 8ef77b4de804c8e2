use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "commitvault";
const CONFIG_FILE: &str = "config.toml";

const EXAMPLE_CONFIG: &str = r#"# commitvault configuration
# Location: ~/.config/commitvault/config.toml

# Working tree of the git repository to monitor (must contain .git/)
repository_path = "/home/user/music"

# Seconds without .git activity before a commit check runs
debounce_seconds = 2

# Git executable
git_binary = "git"

[backup]
# Destination bucket (required)
s3_bucket = "my-backups"

# Endpoint for S3-compatible services, e.g. https://s3.us-east-1.wasabisys.com
# Leave empty for AWS
s3_endpoint_url = ""

# Signing region, e.g. us-east-1
aws_region = "us-east-1"

# Optional folder inside the bucket, e.g. git-backups/my-repo
s3_prefix = ""

# Static credentials. Prefer AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY or
# ~/.aws/credentials and leave these empty.
aws_access_key_id = ""
aws_secret_key = ""

[pipeline]
# Compressed chunks buffered between compression and upload
channel_capacity = 16

# Bytes read from `git archive` per chunk
chunk_size = 65536

# Gzip level 0-9
compression_level = 6

# Abort a backup that takes longer than this many seconds (0 = never)
timeout_secs = 0

[logging]
# off, error, warn, info, debug, trace (RUST_LOG overrides)
level = "info"

# pretty or json
format = "pretty"
"#;

impl Config {
    /// Load configuration with precedence: defaults < file < env < `overrides`.
    ///
    /// `config_file` overrides the default location. `overrides` runs after the
    /// environment layer and before validation, so callers can supply required
    /// fields the file leaves out.
    pub fn load<F>(config_file: Option<PathBuf>, overrides: F) -> ConfigResult<Self>
    where
        F: FnOnce(&mut Self),
    {
        let path = match config_file {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        overrides(&mut config);
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse a config file without applying overrides or validation.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file path: `$XDG_CONFIG_HOME/commitvault/config.toml`.
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Apply `COMMITVAULT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("COMMITVAULT_REPOSITORY_PATH") {
            self.repository_path = PathBuf::from(path);
        }
        if let Ok(secs) = std::env::var("COMMITVAULT_DEBOUNCE_SECONDS") {
            match secs.parse() {
                Ok(secs) => self.debounce_seconds = secs,
                Err(_) => warn!("Ignoring unparsable COMMITVAULT_DEBOUNCE_SECONDS={}", secs),
            }
        }
        if let Ok(bucket) = std::env::var("COMMITVAULT_S3_BUCKET") {
            self.backup.s3_bucket = bucket;
        }
        if let Ok(prefix) = std::env::var("COMMITVAULT_S3_PREFIX") {
            self.backup.s3_prefix = prefix;
        }
        if let Ok(endpoint) = std::env::var("COMMITVAULT_S3_ENDPOINT_URL") {
            self.backup.s3_endpoint_url = endpoint;
        }
        if let Ok(region) = std::env::var("COMMITVAULT_AWS_REGION") {
            self.backup.aws_region = region;
        }
        debug!("Environment overrides applied");
    }

    /// Write a commented example configuration.
    ///
    /// Fails with [`ConfigError::AlreadyExists`] unless `force` is set. On unix the
    /// file is restricted to `0600` since it may hold credentials.
    pub fn write_example(path: &Path, force: bool) -> ConfigResult<()> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, EXAMPLE_CONFIG).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path, perms) {
                warn!("Failed to restrict permissions on {}: {}", path.display(), e);
            }
        }

        info!("Example configuration written to {}", path.display());
        Ok(())
    }
}
