//! Tracing subscriber setup.

use crate::cli::LogLevel;
use anyhow::{anyhow, Result};
use commitvault_config::LogFormat;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Pick the filter directive: `--log-level`, then `--verbose`, then `RUST_LOG`,
/// then the config file level.
pub fn filter_directive(
    log_level: Option<LogLevel>,
    verbose: bool,
    rust_log: Option<String>,
    config_level: &str,
) -> String {
    if let Some(level) = log_level {
        return LevelFilter::from(level).to_string().to_lowercase();
    }
    if verbose {
        return "debug".to_string();
    }
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ => config_level.to_string(),
    }
}

/// Install the global subscriber.
pub fn init(directive: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| anyhow!("invalid log filter '{}': {}", directive, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install logger: {}", e))
}
