//! [`RepositoryClient`] that reads HEAD directly and shells out to `git`.

use crate::parse::{parse_head, parse_name_status, HeadTarget};
use async_trait::async_trait;
use commitvault_core::{ArchiveSource, RepoError, RepositoryClient, SourceProcess};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Captured stderr is cut off after this many bytes.
const STDERR_LIMIT: usize = 16 * 1024;

/// Repository client backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitClient {
    git: String,
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitClient {
    /// Use `git_binary` (a name on `PATH` or an absolute path).
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git: git_binary.into(),
        }
    }

    fn command(&self, repo_path: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-C").arg(repo_path).args(args).kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.git, args.join(" "))
    }

    /// Run to completion and return stdout; non-zero exits become errors.
    async fn output(&self, repo_path: &Path, args: &[&str]) -> Result<Vec<u8>, RepoError> {
        let command = self.describe(args);
        trace!("Running {}", command);

        let output = self
            .command(repo_path, args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RepoError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RepoError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn rev_parse(&self, repo_path: &Path, revision: &str) -> Result<String, RepoError> {
        let stdout = self.output(repo_path, &["rev-parse", revision]).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

#[async_trait]
impl RepositoryClient for GitClient {
    async fn current_commit_id(&self, repo_path: &Path) -> Result<String, RepoError> {
        let git_dir = repo_path.join(".git");
        let head = match tokio::fs::read_to_string(git_dir.join("HEAD")).await {
            Ok(head) => head,
            Err(e) => {
                debug!("Could not read HEAD file ({}), asking git", e);
                return self.rev_parse(repo_path, "HEAD").await;
            }
        };

        match parse_head(&head) {
            HeadTarget::Symbolic(name) => match tokio::fs::read_to_string(git_dir.join(&name)).await {
                Ok(id) => Ok(id.trim().to_string()),
                // Packed or not-yet-created ref.
                Err(_) => self.rev_parse(repo_path, &name).await,
            },
            HeadTarget::Detached(id) => Ok(id),
            HeadTarget::Unknown => self.rev_parse(repo_path, "HEAD").await,
        }
    }

    async fn changed_files(&self, repo_path: &Path, commit: &str) -> Result<Vec<String>, RepoError> {
        let args = ["show", "--pretty=", "--name-status", "-z", commit];
        let stdout = self.output(repo_path, &args).await?;
        parse_name_status(&stdout).map_err(|detail| RepoError::Parse {
            command: self.describe(&args),
            detail,
        })
    }

    async fn archive_stream(
        &self,
        repo_path: &Path,
        commit: &str,
    ) -> Result<ArchiveSource, RepoError> {
        let args = ["archive", "--format=tar", commit];
        let command = self.describe(&args);
        debug!("Starting {}", command);

        let mut child = self
            .command(repo_path, &args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RepoError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RepoError::Spawn {
            command: command.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain_stderr(pipe)));

        Ok(ArchiveSource {
            reader: Box::new(stdout),
            process: Box::new(GitProcess {
                child,
                stderr,
                command,
            }),
        })
    }

    async fn is_tracked(&self, repo_path: &Path, file: &str) -> bool {
        let status = self
            .command(repo_path, &["ls-files", "--error-unmatch", "--", file])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("Failed to run {} ls-files for {}: {}", self.git, file, e);
                false
            }
        }
    }
}

/// Read stderr to the end so the process never blocks on a full pipe, keeping
/// the first [`STDERR_LIMIT`] bytes.
async fn drain_stderr(mut pipe: ChildStderr) -> String {
    let mut kept = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let room = STDERR_LIMIT.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(e) => {
                debug!("Stopped reading stderr: {}", e);
                break;
            }
        }
    }
    String::from_utf8_lossy(&kept).trim().to_string()
}

/// A running `git archive`.
struct GitProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    command: String,
}

impl GitProcess {
    async fn collect_stderr(&mut self) -> String {
        match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        }
    }

    fn check(&self, status: ExitStatus, stderr: String) -> Result<(), RepoError> {
        if status.success() {
            return Ok(());
        }
        Err(RepoError::CommandFailed {
            command: self.command.clone(),
            status: status.to_string(),
            stderr,
        })
    }
}

#[async_trait]
impl SourceProcess for GitProcess {
    async fn wait(&mut self) -> Result<(), RepoError> {
        let status = self.child.wait().await?;
        let stderr = self.collect_stderr().await;
        self.check(status, stderr)
    }

    async fn kill(&mut self) -> Result<(), RepoError> {
        self.child.start_kill()?;
        Ok(())
    }
}
