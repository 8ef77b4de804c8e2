#![allow(dead_code)]

use async_trait::async_trait;
use commitvault_config::PipelineConfig;
use commitvault_core::{
    ArchivePipeline, ArchiveSource, ObjectStoreBackend, Processor, RepoError, RepositoryClient,
    RepositorySession, SourceProcess, ValidationReport, Validator,
};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore as _;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::Notify;

pub const BUCKET: &str = "tracks";

/// How the fake `git archive` behaves for a commit.
#[derive(Debug, Clone)]
pub enum ArchiveBehavior {
    /// Produce these bytes and exit 0.
    Data(Vec<u8>),
    /// Produce these bytes, then fail the read.
    FailAfter(Vec<u8>),
    /// Produce these bytes, then exit non-zero.
    ExitFailure(Vec<u8>),
    /// Never produce anything.
    Stall,
}

/// In-memory repository with scriptable HEAD, change lists and archives.
#[derive(Default)]
pub struct FakeRepo {
    head: Mutex<Option<String>>,
    changes: Mutex<HashMap<String, Vec<String>>>,
    archives: Mutex<HashMap<String, ArchiveBehavior>>,
    tracked: Mutex<Vec<String>>,
    head_gate: Mutex<Option<Arc<Notify>>>,
    pub head_queries: AtomicUsize,
    pub change_queries: AtomicUsize,
    pub archives_started: AtomicUsize,
    pub killed: Arc<AtomicBool>,
}

impl FakeRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Point HEAD at `commit`; `None` makes the query fail.
    pub fn set_head(&self, commit: Option<&str>) {
        *self.head.lock() = commit.map(str::to_string);
    }

    /// Register a commit with its changed files and default archive bytes.
    pub fn add_commit(&self, commit: &str, files: &[&str]) {
        self.changes.lock().insert(
            commit.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self.archives.lock().insert(
            commit.to_string(),
            ArchiveBehavior::Data(format!("tar of {}", commit).into_bytes()),
        );
    }

    pub fn set_archive(&self, commit: &str, behavior: ArchiveBehavior) {
        self.archives.lock().insert(commit.to_string(), behavior);
    }

    /// Make `archive_stream` fail to start for `commit`.
    pub fn clear_archive(&self, commit: &str) {
        self.archives.lock().remove(commit);
    }

    pub fn set_tracked(&self, files: &[&str]) {
        *self.tracked.lock() = files.iter().map(|f| f.to_string()).collect();
    }

    /// Make HEAD queries wait until the returned notify fires.
    pub fn gate_head(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.head_gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl RepositoryClient for FakeRepo {
    async fn current_commit_id(&self, _repo_path: &Path) -> Result<String, RepoError> {
        self.head_queries.fetch_add(1, Ordering::SeqCst);
        let gate = self.head_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.head.lock().clone().ok_or_else(|| RepoError::CommandFailed {
            command: "git rev-parse HEAD".to_string(),
            status: "exit status: 128".to_string(),
            stderr: "fatal: not a git repository".to_string(),
        })
    }

    async fn changed_files(&self, _repo_path: &Path, commit: &str) -> Result<Vec<String>, RepoError> {
        self.change_queries.fetch_add(1, Ordering::SeqCst);
        self.changes
            .lock()
            .get(commit)
            .cloned()
            .ok_or_else(|| RepoError::CommandFailed {
                command: format!("git show --name-status {}", commit),
                status: "exit status: 128".to_string(),
                stderr: format!("fatal: bad object {}", commit),
            })
    }

    async fn archive_stream(
        &self,
        _repo_path: &Path,
        commit: &str,
    ) -> Result<ArchiveSource, RepoError> {
        self.archives_started.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .archives
            .lock()
            .get(commit)
            .cloned()
            .ok_or_else(|| RepoError::Spawn {
                command: format!("git archive {}", commit),
                source: io::Error::new(io::ErrorKind::NotFound, "no such commit"),
            })?;

        let (data, fail_read, fail_exit, stall) = match behavior {
            ArchiveBehavior::Data(data) => (data, false, false, false),
            ArchiveBehavior::FailAfter(data) => (data, true, false, false),
            ArchiveBehavior::ExitFailure(data) => (data, false, true, false),
            ArchiveBehavior::Stall => (Vec::new(), false, false, true),
        };

        Ok(ArchiveSource {
            reader: Box::new(ScriptedReader {
                data: Some(data),
                fail_read,
                stall,
            }),
            process: Box::new(FakeProcess {
                fail_exit,
                killed: Arc::clone(&self.killed),
            }),
        })
    }

    async fn is_tracked(&self, _repo_path: &Path, file: &str) -> bool {
        self.tracked.lock().iter().any(|f| f == file)
    }
}

struct ScriptedReader {
    data: Option<Vec<u8>>,
    fail_read: bool,
    stall: bool,
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.stall {
            return Poll::Pending;
        }
        match self.data.take() {
            Some(data) => {
                buf.put_slice(&data);
                Poll::Ready(Ok(()))
            }
            None if self.fail_read => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "archive process died",
            ))),
            None => Poll::Ready(Ok(())),
        }
    }
}

struct FakeProcess {
    fail_exit: bool,
    killed: Arc<AtomicBool>,
}

#[async_trait]
impl SourceProcess for FakeProcess {
    async fn wait(&mut self) -> Result<(), RepoError> {
        if self.fail_exit {
            return Err(RepoError::CommandFailed {
                command: "git archive".to_string(),
                status: "exit status: 128".to_string(),
                stderr: "fatal: corrupt object".to_string(),
            });
        }
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), RepoError> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Rejects any path containing a space.
#[derive(Default)]
pub struct NoSpacesValidator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Validator for NoSpacesValidator {
    async fn validate(&self, _repo_path: &Path, changed_files: &[String]) -> ValidationReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ValidationReport::with_violations(
            changed_files
                .iter()
                .filter(|f| f.contains(' '))
                .map(|f| format!("Path contains spaces: '{}'", f))
                .collect(),
        )
    }
}

/// Processor wired to `repo`, a space-rejecting validator and an in-memory bucket.
pub struct Harness {
    pub repo: Arc<FakeRepo>,
    pub validator: Arc<NoSpacesValidator>,
    pub memory: Arc<InMemory>,
    pub processor: Arc<Processor>,
}

impl Harness {
    pub fn new(repo: Arc<FakeRepo>, initial: &str) -> Self {
        Self::with_settings(repo, initial, None, PipelineConfig::default())
    }

    pub fn with_settings(
        repo: Arc<FakeRepo>,
        initial: &str,
        prefix: Option<&str>,
        settings: PipelineConfig,
    ) -> Self {
        let validator = Arc::new(NoSpacesValidator::default());
        let memory = Arc::new(InMemory::new());
        let store = Arc::new(ObjectStoreBackend::new(BUCKET, memory.clone()));
        let pipeline = ArchivePipeline::new(
            repo.clone(),
            store,
            BUCKET,
            prefix.map(str::to_string),
            settings,
        );
        let processor = Arc::new(Processor::new(
            RepositorySession::new("/srv/music", initial),
            repo.clone(),
            validator.clone(),
            pipeline,
        ));
        Self {
            repo,
            validator,
            memory,
            processor,
        }
    }

    pub fn tracked(&self) -> String {
        self.processor.session().last_known_commit()
    }

    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        let result = self.memory.get(&ObjectPath::from(key)).await.ok()?;
        Some(result.bytes().await.ok()?.to_vec())
    }
}

/// Gunzip an uploaded object.
pub fn gunzip(bytes: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .unwrap();
    out
}
