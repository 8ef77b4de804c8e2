//! One check-and-act cycle per settle signal.

use crate::error::PipelineError;
use crate::pipeline::{ArchivePipeline, UploadReport};
use crate::session::{RepositorySession, Transition};
use crate::token::ProcessingToken;
use crate::traits::{RepositoryClient, Validator};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Another cycle held the token; this request was dropped.
    Busy,
    /// HEAD could not be read. Nothing changed.
    QueryFailed,
    /// HEAD still points at the tracked commit.
    Unchanged,
    /// HEAD read empty while a commit is tracked. Nothing changed.
    EmptyHead,
    /// The commit's changed files could not be listed; tracking was rolled back.
    ChangesUnavailable {
        /// Commit that could not be inspected.
        commit: String,
    },
    /// The commit violates the naming policy. It stays tracked.
    Rejected {
        /// Offending commit.
        commit: String,
        /// Every violation found.
        violations: Vec<String>,
    },
    /// The snapshot was uploaded.
    BackedUp {
        /// Archived commit.
        commit: String,
        /// Upload details.
        report: UploadReport,
    },
    /// The pipeline failed. The commit stays tracked and is not retried.
    BackupFailed {
        /// Commit whose backup failed.
        commit: String,
        /// Pipeline failure.
        error: PipelineError,
    },
}

impl CycleOutcome {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::QueryFailed => "query_failed",
            Self::Unchanged => "unchanged",
            Self::EmptyHead => "empty_head",
            Self::ChangesUnavailable { .. } => "changes_unavailable",
            Self::Rejected { .. } => "rejected",
            Self::BackedUp { .. } => "backed_up",
            Self::BackupFailed { .. } => "backup_failed",
        }
    }
}

/// Decides whether HEAD moved and, if so, validates and archives the new commit.
///
/// Cycles are single-flight: a `check` that starts while another is running
/// returns [`CycleOutcome::Busy`] immediately.
pub struct Processor {
    session: RepositorySession,
    token: ProcessingToken,
    repo: Arc<dyn RepositoryClient>,
    validator: Arc<dyn Validator>,
    pipeline: ArchivePipeline,
}

impl Processor {
    /// Create a processor owning `session`.
    pub fn new(
        session: RepositorySession,
        repo: Arc<dyn RepositoryClient>,
        validator: Arc<dyn Validator>,
        pipeline: ArchivePipeline,
    ) -> Self {
        Self {
            session,
            token: ProcessingToken::new(),
            repo,
            validator,
            pipeline,
        }
    }

    /// Session state, for inspection.
    pub fn session(&self) -> &RepositorySession {
        &self.session
    }

    /// Whether a cycle is in flight.
    pub fn is_running(&self) -> bool {
        self.token.is_running()
    }

    /// Run one cycle.
    pub async fn check(&self) -> CycleOutcome {
        let Some(_guard) = self.token.try_acquire() else {
            info!("Commit check already in progress, skipping");
            return CycleOutcome::Busy;
        };

        let repo_path = self.session.repo_path();
        let current = match self.repo.current_commit_id(repo_path).await {
            Ok(commit) => commit,
            Err(e) => {
                error!(path = %repo_path.display(), "Error getting current commit hash: {}", e);
                return CycleOutcome::QueryFailed;
            }
        };

        let previous = match self.session.observe(&current) {
            Transition::Unchanged => {
                debug!(commit = %current, "No new commit");
                return CycleOutcome::Unchanged;
            }
            Transition::EmptyHead => {
                warn!(
                    path = %repo_path.display(),
                    "HEAD is empty while commit {} is tracked; ignoring",
                    self.session.last_known_commit()
                );
                return CycleOutcome::EmptyHead;
            }
            Transition::Advanced { previous } => previous,
        };
        info!(commit = %current, previous = %previous, "New commit detected");

        let changed = match self.repo.changed_files(repo_path, &current).await {
            Ok(files) => files,
            Err(e) => {
                error!(commit = %current, "Error listing changed files: {}", e);
                self.session.rollback(previous);
                return CycleOutcome::ChangesUnavailable { commit: current };
            }
        };
        debug!(commit = %current, "{} changed files", changed.len());

        let report = self.validator.validate(repo_path, &changed).await;
        if !report.is_valid() {
            warn!(
                commit = %current,
                "Commit does not follow the naming policy; skipping backup"
            );
            for violation in &report.violations {
                warn!(commit = %current, "  - {}", violation);
            }
            return CycleOutcome::Rejected {
                commit: current,
                violations: report.violations,
            };
        }

        info!(commit = %current, "Validation passed; starting backup");
        match self.pipeline.run(repo_path, &current).await {
            Ok(report) => CycleOutcome::BackedUp {
                commit: current,
                report,
            },
            Err(error) => {
                error!(
                    commit = %current,
                    key = %self.pipeline.key_for(&current),
                    "Backup failed: {}",
                    error
                );
                CycleOutcome::BackupFailed {
                    commit: current,
                    error,
                }
            }
        }
    }
}
