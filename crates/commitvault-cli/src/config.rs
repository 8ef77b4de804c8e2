use crate::cli::Cli;
use anyhow::{Context, Result};
use commitvault_config::Config;
use std::path::PathBuf;

/// Command-line values that override file and environment settings.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub repo: Option<PathBuf>,
    pub bucket: Option<String>,
    pub debounce_seconds: Option<u64>,
}

impl Overrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            repo: cli.repo.clone(),
            bucket: cli.bucket.clone(),
            debounce_seconds: None,
        }
    }

    fn apply(&self, config: &mut Config) {
        if let Some(repo) = &self.repo {
            config.repository_path = repo.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.backup.s3_bucket = bucket.clone();
        }
        if let Some(secs) = self.debounce_seconds {
            config.debounce_seconds = secs;
        }
    }
}

/// Resolve the config file location: `--config`, else the default path.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Config::default_config_path().context("Failed to locate the configuration file"),
    }
}

/// Load configuration with precedence: defaults < file < env < CLI.
pub fn load(explicit: Option<PathBuf>, overrides: &Overrides) -> Result<Config> {
    let path = config_path(explicit)?;
    let config = Config::load(Some(path), |config| overrides.apply(config))?;
    Ok(config)
}
