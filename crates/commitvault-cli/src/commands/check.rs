use anyhow::{Context, Result};
use commitvault_config::Config;
use commitvault_core::{RepositoryClient, ValidationReport, Validator};
use commitvault_git::GitClient;
use commitvault_policy::NamingPolicy;
use std::sync::Arc;

/// Validate `commit` (or HEAD) once and print the result.
///
/// Returns whether the commit passed.
pub async fn execute(config: Config, commit: Option<String>) -> Result<bool> {
    let repo = Arc::new(GitClient::new(config.git_binary.clone()));
    let policy = NamingPolicy::new(repo.clone());
    let path = &config.repository_path;

    let commit = match commit {
        Some(commit) => commit,
        None => repo
            .current_commit_id(path)
            .await
            .with_context(|| format!("Failed to read HEAD of {}", path.display()))?,
    };
    let changed = repo
        .changed_files(path, &commit)
        .await
        .with_context(|| format!("Failed to list files changed by {}", commit))?;

    let report = policy.validate(path, &changed).await;
    print!("{}", render(&commit, changed.len(), &report));
    Ok(report.is_valid())
}

/// Human-readable summary of a validation run.
pub fn render(commit: &str, changed: usize, report: &ValidationReport) -> String {
    let mut out = format!("Commit {} ({} changed file(s))\n", commit, changed);
    if report.is_valid() {
        out.push_str("✓ Passes the naming policy\n");
    } else {
        out.push_str(&format!("✗ {} violation(s):\n", report.violations.len()));
        for violation in &report.violations {
            out.push_str(&format!("  - {}\n", violation));
        }
    }
    out
}
