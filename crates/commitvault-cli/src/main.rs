use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;

use commitvault_cli::{
    cli::{Cli, Commands},
    commands,
    config::{self, Overrides},
    logging,
};
use commitvault_config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Default to watching when no subcommand is given
    let command = cli.command.clone().unwrap_or(Commands::Run {
        debounce_seconds: None,
    });

    match command {
        Commands::Init { force } => {
            init_logging(&cli, &LoggingConfig::default())?;
            commands::init::execute(cli.config, force)?;
        }
        Commands::Run { debounce_seconds } => {
            let config = load_config(&cli, debounce_seconds)?;
            commands::run::execute(config).await?;
        }
        Commands::Check { commit } => {
            let config = load_config(&cli, None)?;
            if !commands::check::execute(config, commit).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load configuration and install logging from it.
fn load_config(cli: &Cli, debounce_seconds: Option<u64>) -> Result<Config> {
    let overrides = Overrides {
        debounce_seconds,
        ..Overrides::from_cli(cli)
    };
    let config = config::load(cli.config.clone(), &overrides)?;
    init_logging(cli, &config.logging)?;
    debug!("Pipeline settings: {:?}", config.pipeline);
    Ok(config)
}

fn init_logging(cli: &Cli, settings: &LoggingConfig) -> Result<()> {
    let directive = logging::filter_directive(
        cli.log_level,
        cli.verbose,
        std::env::var("RUST_LOG").ok(),
        &settings.level,
    );
    logging::init(&directive, settings.format)
}
