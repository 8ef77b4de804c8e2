//! Streaming archive → gzip → upload pipeline.
//!
//! ```text
//! ┌──────────────┐  stdout  ┌──────────────┐  byte_channel  ┌──────────────┐
//! │ git archive  │─────────▶│  Transform   │───(bounded)───▶│  Sink (put)  │
//! │  (process)   │          │ gzip, task   │                │ caller task  │
//! └──────────────┘          └──────────────┘                └──────────────┘
//! ```
//!
//! Reading drives everything: the sink pulls from the channel, the transform
//! blocks on a full channel, the source blocks on an unread pipe. Nothing holds
//! the whole archive in memory.

use crate::channel::{byte_channel, ByteSender};
use crate::error::{PipelineError, PipelineResult, RepoError, StoreError};
use crate::traits::{ArchiveSource, ObjectStore, RepositoryClient, SourceProcess};
use bytes::Bytes;
use commitvault_config::PipelineConfig;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Object key for a commit snapshot: `{prefix/}commit-{hash}.tar.gz`.
///
/// Slashes around the prefix are trimmed; an empty prefix is omitted.
pub fn object_key(prefix: Option<&str>, commit: &str) -> String {
    let file = format!("commit-{}.tar.gz", commit);
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, file),
        None => file,
    }
}

/// Byte counts from a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Object key written.
    pub key: String,
    /// Uncompressed archive bytes read from the source.
    pub archive_bytes: u64,
    /// Compressed bytes stored.
    pub stored_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct TransformStats {
    read: u64,
    written: u64,
}

#[derive(Debug, thiserror::Error)]
enum TransformError {
    #[error("reading archive source failed: {0}")]
    Read(io::Error),
    #[error("compressor failed: {0}")]
    Compress(io::Error),
    #[error("upload side closed the channel")]
    SinkClosed,
}

/// Read `source` to the end, gzip it and push the output into `sink`.
///
/// Owns the encoder and writes the gzip trailer, then hands `sink` back still
/// open: the caller closes it once the source process has exited. Source and
/// encoder failures poison the channel so the reader sees them instead of a
/// short stream.
async fn compress_stream<R>(
    mut source: R,
    sink: ByteSender,
    chunk_size: usize,
    level: u32,
) -> Result<(TransformStats, ByteSender), TransformError>
where
    R: AsyncRead + Unpin,
{
    let mut encoder = GzEncoder::new(Vec::with_capacity(chunk_size), Compression::new(level));
    let mut buf = vec![0u8; chunk_size];
    let mut stats = TransformStats::default();

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                sink.close_with_error(io::Error::new(e.kind(), e.to_string()));
                return Err(TransformError::Read(e));
            }
        };
        stats.read += n as u64;

        if let Err(e) = encoder.write_all(&buf[..n]) {
            sink.close_with_error(io::Error::new(e.kind(), e.to_string()));
            return Err(TransformError::Compress(e));
        }

        let out = std::mem::take(encoder.get_mut());
        if !out.is_empty() {
            stats.written += out.len() as u64;
            sink.send(Bytes::from(out))
                .await
                .map_err(|_| TransformError::SinkClosed)?;
        }
    }

    let tail = match encoder.finish() {
        Ok(tail) => tail,
        Err(e) => {
            sink.close_with_error(io::Error::new(e.kind(), e.to_string()));
            return Err(TransformError::Compress(e));
        }
    };
    if !tail.is_empty() {
        stats.written += tail.len() as u64;
        sink.send(Bytes::from(tail))
            .await
            .map_err(|_| TransformError::SinkClosed)?;
    }

    debug!(
        "Compression finished: {} bytes in, {} bytes out",
        stats.read, stats.written
    );
    Ok((stats, sink))
}

/// Why the stream feeding the upload was not closed cleanly.
#[derive(Debug)]
enum SealError {
    Transform(String),
    Source(RepoError),
}

/// Join the transform task, reap the source process and close the channel.
///
/// The channel ends cleanly only when both succeeded. Otherwise it is poisoned
/// (or already was) so the sink aborts instead of committing a partial archive.
async fn seal_stream(
    transform: &mut JoinHandle<Result<(TransformStats, ByteSender), TransformError>>,
    process: &mut dyn SourceProcess,
) -> Result<TransformStats, SealError> {
    let transformed = match transform.await {
        Ok(Ok(done)) => Ok(done),
        Ok(Err(e)) => Err(SealError::Transform(e.to_string())),
        Err(e) => Err(SealError::Transform(e.to_string())),
    };
    let exited = process.wait().await;

    match (transformed, exited) {
        (Ok((stats, sink)), Ok(())) => {
            sink.finish();
            Ok(stats)
        }
        (Ok((_, sink)), Err(e)) => {
            sink.close_with_error(io::Error::other(format!("archive source failed: {}", e)));
            Err(SealError::Source(e))
        }
        (Err(failure), Err(e)) => {
            debug!("Archive source also failed: {}", e);
            Err(failure)
        }
        (Err(failure), Ok(())) => Err(failure),
    }
}

/// Archives one commit and streams it to the object store.
pub struct ArchivePipeline {
    repo: Arc<dyn RepositoryClient>,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: Option<String>,
    settings: PipelineConfig,
}

impl ArchivePipeline {
    /// Create a pipeline writing to `bucket` under `prefix`.
    pub fn new(
        repo: Arc<dyn RepositoryClient>,
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            repo,
            store,
            bucket: bucket.into(),
            prefix,
            settings,
        }
    }

    /// Key this pipeline would write for `commit`.
    pub fn key_for(&self, commit: &str) -> String {
        object_key(self.prefix.as_deref(), commit)
    }

    /// Archive `commit`, compress and upload it.
    ///
    /// The upload is committed only after the source process exited
    /// successfully; a failing source aborts it, so no object is left at the
    /// key. An upload failure is the primary error and a simultaneous source
    /// failure is logged alongside it. On timeout the upload is abandoned, the
    /// compression task aborted and the source process killed.
    pub async fn run(&self, repo_path: &Path, commit: &str) -> PipelineResult<UploadReport> {
        let key = self.key_for(commit);
        info!(commit = %commit, bucket = %self.bucket, key = %key, "Starting backup");

        let ArchiveSource {
            reader,
            mut process,
        } = self
            .repo
            .archive_stream(repo_path, commit)
            .await
            .map_err(PipelineError::SourceStart)?;

        let (sender, receiver) = byte_channel(self.settings.channel_capacity);
        let mut transform = tokio::spawn(compress_stream(
            reader,
            sender,
            self.settings.chunk_size,
            self.settings.compression_level,
        ));

        let work = async {
            tokio::join!(
                self.store.put(&self.bucket, &key, receiver),
                seal_stream(&mut transform, process.as_mut()),
            )
        };
        let finished = match self.settings.timeout() {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| limit),
            None => Ok(work.await),
        };
        let (upload_result, sealed) = match finished {
            Ok(results) => results,
            Err(limit) => {
                error!(commit = %commit, key = %key, "Backup timed out after {:?}", limit);
                transform.abort();
                let _ = transform.await;
                if let Err(e) = process.kill().await {
                    warn!("Failed to kill archive source for {}: {}", commit, e);
                }
                if let Err(e) = process.wait().await {
                    debug!("Archive source for {} exited after kill: {}", commit, e);
                }
                return Err(PipelineError::TimedOut { key, after: limit });
            }
        };

        let (stored_bytes, stats) = match (upload_result, sealed) {
            (Ok(stored), Ok(stats)) => (stored, stats),
            (Err(StoreError::Stream { .. }), Err(SealError::Source(source))) => {
                warn!(commit = %commit, key = %key, "Upload aborted, archive source failed");
                return Err(PipelineError::SourceFailed { key, source });
            }
            (Err(source), sealed) => {
                match sealed {
                    Err(SealError::Source(e)) => {
                        warn!(commit = %commit, "Archive source also failed: {}", e)
                    }
                    Err(SealError::Transform(reason)) => {
                        debug!(commit = %commit, "Compression stopped: {}", reason)
                    }
                    Ok(_) => {}
                }
                return Err(PipelineError::Upload { key, source });
            }
            // A sink that ignores stream errors; still report the failure.
            (Ok(_), Err(SealError::Source(source))) => {
                return Err(PipelineError::SourceFailed { key, source });
            }
            (Ok(_), Err(SealError::Transform(reason))) => {
                return Err(PipelineError::Transform { key, reason });
            }
        };

        info!(
            commit = %commit,
            key = %key,
            "Upload succeeded: {} archive bytes, {} stored",
            stats.read,
            stored_bytes
        );
        Ok(UploadReport {
            key,
            archive_bytes: stats.read,
            stored_bytes,
        })
    }
}
