use crate::rules::check_path;
use async_trait::async_trait;
use commitvault_core::{RepositoryClient, ValidationReport, Validator};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Files that must be tracked in the index for any commit to pass.
pub const REQUIRED_FILES: &[&str] = &["README.md", ".gitignore"];

/// Repository layout and naming policy for music project repositories.
///
/// Every changed path is checked and all violations are collected. The
/// required-file check runs afterwards regardless of the per-path results.
pub struct NamingPolicy {
    repo: Arc<dyn RepositoryClient>,
}

impl NamingPolicy {
    /// Policy that consults `repo` for the required-file check.
    pub fn new(repo: Arc<dyn RepositoryClient>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Validator for NamingPolicy {
    async fn validate(&self, repo_path: &Path, changed_files: &[String]) -> ValidationReport {
        let mut violations = Vec::new();

        debug!("Checking {} changed file(s)", changed_files.len());
        for file in changed_files {
            let errors = check_path(file);
            if !errors.is_empty() {
                debug!("{} violation(s) in {}", errors.len(), file);
            }
            violations.extend(errors);
        }

        for required in REQUIRED_FILES {
            if !self.repo.is_tracked(repo_path, required).await {
                violations.push(format!(
                    "Required file '{}' not found in repository index.",
                    required
                ));
            }
        }

        ValidationReport::with_violations(violations)
    }
}
