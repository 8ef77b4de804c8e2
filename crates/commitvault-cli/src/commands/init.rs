use anyhow::Result;
use commitvault_config::Config;
use std::path::PathBuf;

use crate::config::config_path;

/// Write the example configuration to `config` (or the default location).
pub fn execute(config: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let path = config_path(config)?;
    Config::write_example(&path, force)?;

    println!("Wrote example configuration to {}", path.display());
    println!("Edit repository_path and backup.s3_bucket, then run `commitvault run`.");
    Ok(path)
}
