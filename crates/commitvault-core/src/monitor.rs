//! Startup glue: verify the repository, seed the session, watch and dispatch.

use crate::error::MonitorError;
use crate::pipeline::ArchivePipeline;
use crate::processor::{CycleOutcome, Processor};
use crate::session::RepositorySession;
use crate::traits::{ObjectStore, RepositoryClient, Validator};
use commitvault_config::Config;
use commitvault_watch::{Debouncer, EventStream, MetadataWatcher};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Long-running monitor for one repository.
pub struct Monitor {
    git_dir: PathBuf,
    debounce: Duration,
    processor: Arc<Processor>,
}

impl Monitor {
    /// Prepare a monitor for `config.repository_path`.
    ///
    /// Fails if the repository has no `.git` directory. The session is seeded
    /// from the current HEAD; an unreadable or empty HEAD starts it empty, so the
    /// first commit seen afterwards is treated as new.
    pub async fn start(
        config: &Config,
        repo: Arc<dyn RepositoryClient>,
        validator: Arc<dyn Validator>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, MonitorError> {
        let git_dir = config.git_dir();
        if !git_dir.is_dir() {
            return Err(MonitorError::NotARepository(config.repository_path.clone()));
        }

        let initial = match repo.current_commit_id(&config.repository_path).await {
            Ok(commit) if commit.is_empty() => {
                warn!("Repository has no commits yet; starting with an empty state");
                commit
            }
            Ok(commit) => {
                info!(commit = %commit, "Initial commit");
                commit
            }
            Err(e) => {
                warn!(
                    path = %config.repository_path.display(),
                    "Could not read initial commit, starting with an empty state: {}",
                    e
                );
                String::new()
            }
        };

        let pipeline = ArchivePipeline::new(
            Arc::clone(&repo),
            store,
            config.backup.s3_bucket.clone(),
            config.backup.normalized_prefix().map(str::to_string),
            config.pipeline.clone(),
        );
        let session = RepositorySession::new(config.repository_path.clone(), initial);

        Ok(Self {
            git_dir,
            debounce: config.debounce(),
            processor: Arc::new(Processor::new(session, repo, validator, pipeline)),
        })
    }

    /// The processor driven by this monitor.
    pub fn processor(&self) -> &Arc<Processor> {
        &self.processor
    }

    /// Watch the metadata directory until `shutdown` resolves.
    ///
    /// Watcher construction errors are returned before any event is processed.
    pub async fn run<F>(self, shutdown: F) -> Result<(), MonitorError>
    where
        F: Future<Output = ()>,
    {
        let (watcher, events) = MetadataWatcher::start(&self.git_dir)?;
        info!(
            "Monitoring {} ({} directories)",
            self.git_dir.display(),
            watcher.watched_dirs().len()
        );

        self.drive(events, shutdown).await;
        drop(watcher);
        Ok(())
    }

    /// Debounce `events` and dispatch a processor cycle per settle signal.
    ///
    /// Each cycle runs as its own task. Stops when the stream ends or `shutdown`
    /// resolves, then waits for in-flight cycles. Returns the number of cycles
    /// dispatched.
    pub async fn drive<F>(&self, events: EventStream, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut cycles: JoinSet<CycleOutcome> = JoinSet::new();
        let mut dispatched = 0u64;

        {
            let settle = Debouncer::new(self.debounce).run(events, || {
                while let Some(done) = cycles.try_join_next() {
                    log_cycle(done);
                }
                let processor = Arc::clone(&self.processor);
                cycles.spawn(async move { processor.check().await });
                dispatched += 1;
            });

            tokio::select! {
                _ = settle => info!("Metadata event stream ended"),
                _ = shutdown => info!("Shutdown requested"),
            }
        }

        if !cycles.is_empty() {
            info!("Waiting for {} in-flight commit check(s)", cycles.len());
        }
        while let Some(done) = cycles.join_next().await {
            log_cycle(done);
        }

        debug!("Monitor stopped after {} cycles", dispatched);
        dispatched
    }
}

fn log_cycle(done: Result<CycleOutcome, JoinError>) {
    match done {
        Ok(outcome) => debug!("Commit check finished: {}", outcome.as_str()),
        Err(e) if e.is_panic() => error!("Commit check panicked: {}", e),
        Err(e) => warn!("Commit check cancelled: {}", e),
    }
}
