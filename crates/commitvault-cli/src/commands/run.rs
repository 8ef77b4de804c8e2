use anyhow::{Context, Result};
use commitvault_config::Config;
use commitvault_core::{Monitor, ObjectStoreBackend};
use commitvault_git::GitClient;
use commitvault_policy::NamingPolicy;
use std::sync::Arc;
use tracing::{info, warn};

/// Watch the configured repository until SIGINT or SIGTERM.
pub async fn execute(config: Config) -> Result<()> {
    info!(
        "Monitoring {} -> s3://{}/{}",
        config.repository_path.display(),
        config.backup.s3_bucket,
        config.backup.normalized_prefix().unwrap_or("")
    );

    let repo = Arc::new(GitClient::new(config.git_binary.clone()));
    let validator = Arc::new(NamingPolicy::new(repo.clone()));
    let store = Arc::new(
        ObjectStoreBackend::s3(&config.backup).context("Failed to create object store client")?,
    );

    let monitor = Monitor::start(&config, repo, validator, store)
        .await
        .context("Failed to start monitor")?;
    monitor
        .run(shutdown_signal())
        .await
        .context("Monitor stopped with an error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
