//! GitClient against real repositories created in temporary directories.
//!
//! Tests return early when no `git` executable is available.

use commitvault_core::{RepoError, RepositoryClient};
use commitvault_git::GitClient;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Option<Self> {
        if Command::new("git").arg("--version").output().is_err() {
            eprintln!("git not available, skipping");
            return None;
        }
        let repo = Self {
            dir: TempDir::new().unwrap(),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "user.name", "Test"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        Some(repo)
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.path())
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn write(&self, file: &str, content: &str) {
        let path = self.path().join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }
}

#[tokio::test]
async fn test_current_commit_follows_branch_ref() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    let first = repo.commit("first");

    let client = GitClient::default();
    assert_eq!(client.current_commit_id(repo.path()).await.unwrap(), first);

    repo.write("README.md", "hello again\n");
    let second = repo.commit("second");
    assert_eq!(client.current_commit_id(repo.path()).await.unwrap(), second);
}

#[tokio::test]
async fn test_current_commit_with_detached_head() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    let first = repo.commit("first");
    repo.write("README.md", "changed\n");
    repo.commit("second");
    repo.git(&["checkout", "-q", "--detach", &first]);

    let client = GitClient::default();
    assert_eq!(client.current_commit_id(repo.path()).await.unwrap(), first);
}

#[tokio::test]
async fn test_current_commit_with_packed_refs() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    let first = repo.commit("first");
    repo.git(&["pack-refs", "--all", "--prune"]);
    assert!(!repo.path().join(".git/refs/heads/main").exists());

    let client = GitClient::default();
    assert_eq!(client.current_commit_id(repo.path()).await.unwrap(), first);
}

#[tokio::test]
async fn test_current_commit_fails_without_commits() {
    let Some(repo) = TestRepo::new() else { return };
    let client = GitClient::default();
    assert!(matches!(
        client.current_commit_id(repo.path()).await,
        Err(RepoError::CommandFailed { .. })
    ));
}

#[tokio::test]
async fn test_changed_files_resolves_renames_and_skips_deletes() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    repo.write("old.txt", "to be removed\n");
    repo.write("before.txt", "same content for rename detection\n");
    repo.commit("first");

    std::fs::remove_file(repo.path().join("old.txt")).unwrap();
    std::fs::rename(repo.path().join("before.txt"), repo.path().join("after.txt")).unwrap();
    repo.write("README.md", "changed\n");
    repo.write("weird name.flp", "project\n");
    let second = repo.commit("second");

    let client = GitClient::default();
    let mut files = client.changed_files(repo.path(), &second).await.unwrap();
    files.sort();
    assert_eq!(files, vec!["README.md", "after.txt", "weird name.flp"]);
}

#[tokio::test]
async fn test_changed_files_for_unknown_commit_fails() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    repo.commit("first");

    let client = GitClient::default();
    let err = client
        .changed_files(repo.path(), "0000000000000000000000000000000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::CommandFailed { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_archive_stream_produces_tar_of_commit() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello archive\n");
    let head = repo.commit("first");

    let client = GitClient::default();
    let mut source = client.archive_stream(repo.path(), &head).await.unwrap();

    let mut tar = Vec::new();
    source.reader.read_to_end(&mut tar).await.unwrap();
    source.process.wait().await.unwrap();

    // Tar archives are padded to 512-byte blocks and carry names in the headers.
    assert_eq!(tar.len() % 512, 0);
    let text = String::from_utf8_lossy(&tar);
    assert!(text.contains("README.md"));
    assert!(text.contains("hello archive"));
}

#[tokio::test]
async fn test_archive_of_bad_commit_reports_stderr_on_wait() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    repo.commit("first");

    let client = GitClient::default();
    let mut source = client
        .archive_stream(repo.path(), "does-not-exist")
        .await
        .unwrap();

    let mut out = Vec::new();
    source.reader.read_to_end(&mut out).await.unwrap();
    assert!(out.is_empty());

    match source.process.wait().await {
        Err(RepoError::CommandFailed { stderr, .. }) => assert!(!stderr.is_empty()),
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_git_binary_is_a_spawn_error() {
    let Some(repo) = TestRepo::new() else { return };
    let client = GitClient::new("/nonexistent/git-binary");
    assert!(matches!(
        client.archive_stream(repo.path(), "HEAD").await,
        Err(RepoError::Spawn { .. })
    ));
    assert!(!client.is_tracked(repo.path(), "README.md").await);
}

#[tokio::test]
async fn test_is_tracked_checks_the_index() {
    let Some(repo) = TestRepo::new() else { return };
    repo.write("README.md", "hello\n");
    repo.commit("first");
    repo.write("untracked.txt", "not added\n");

    let client = GitClient::default();
    assert!(client.is_tracked(repo.path(), "README.md").await);
    assert!(!client.is_tracked(repo.path(), "untracked.txt").await);
    assert!(!client.is_tracked(repo.path(), ".gitignore").await);
}
