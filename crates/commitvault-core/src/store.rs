//! [`ObjectStore`] backed by the `object_store` crate.
//!
//! Uploads go through one multipart upload per object, so the payload is never
//! buffered in full. If the input stream fails or the remote rejects a part, the
//! multipart upload is aborted and no object becomes visible under the key.

use crate::channel::ByteReceiver;
use crate::error::StoreError;
use crate::traits::ObjectStore;
use async_trait::async_trait;
use commitvault_config::BackupConfig;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore as RemoteStore, WriteMultipart};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parts allowed in flight before the upload waits on the network.
const MAX_CONCURRENT_PARTS: usize = 4;

/// A single bucket served by an `object_store` implementation.
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    bucket: String,
    store: Arc<dyn RemoteStore>,
}

impl ObjectStoreBackend {
    /// Serve `bucket` from an existing store (S3, in-memory, local filesystem).
    pub fn new(bucket: impl Into<String>, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    /// Build an S3-compatible client from the backup configuration.
    ///
    /// Static credentials are used when configured; otherwise the standard
    /// `AWS_*` environment variables and instance metadata apply.
    pub fn s3(config: &BackupConfig) -> Result<Self, StoreError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.s3_bucket);

        if !config.aws_region.is_empty() {
            builder = builder.with_region(&config.aws_region);
        }
        if !config.s3_endpoint_url.is_empty() {
            builder = builder
                .with_endpoint(&config.s3_endpoint_url)
                .with_allow_http(config.s3_endpoint_url.starts_with("http://"));
        }
        match config.static_credentials() {
            Some((key_id, secret)) => {
                info!("Using static credentials from config file");
                builder = builder
                    .with_access_key_id(key_id)
                    .with_secret_access_key(secret);
            }
            None => debug!("Using default AWS credential chain"),
        }

        let store = builder
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        Ok(Self::new(config.s3_bucket.clone(), Arc::new(store)))
    }

    /// Bucket this backend writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for ObjectStoreBackend {
    async fn put(&self, bucket: &str, key: &str, mut body: ByteReceiver) -> Result<u64, StoreError> {
        if bucket != self.bucket {
            return Err(StoreError::UnknownBucket(bucket.to_string()));
        }

        let location = ObjectPath::from(key);
        let upload = self
            .store
            .put_multipart(&location)
            .await
            .map_err(|source| StoreError::Upload {
                key: key.to_string(),
                source,
            })?;
        let mut upload = PendingUpload::new(WriteMultipart::new(upload), key);
        let mut total = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    upload.abort().await;
                    return Err(StoreError::Stream {
                        key: key.to_string(),
                        source,
                    });
                }
            };

            if let Err(source) = upload.write(&chunk).await {
                upload.abort().await;
                return Err(StoreError::Upload {
                    key: key.to_string(),
                    source,
                });
            }
            total += chunk.len() as u64;
        }

        upload.finish().await.map_err(|source| StoreError::Upload {
            key: key.to_string(),
            source,
        })?;

        debug!("Stored {} bytes at {}/{}", total, bucket, key);
        Ok(total)
    }
}

/// A multipart upload that is aborted unless it is finished.
///
/// Dropping it mid-upload (the `put` future was cancelled, e.g. on a pipeline
/// timeout) spawns the abort on the current runtime so the store discards the
/// uploaded parts.
struct PendingUpload {
    writer: Option<WriteMultipart>,
    key: String,
}

impl PendingUpload {
    fn new(writer: WriteMultipart, key: &str) -> Self {
        Self {
            writer: Some(writer),
            key: key.to_string(),
        }
    }

    async fn write(&mut self, chunk: &[u8]) -> object_store::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
            writer.write(chunk);
        }
        Ok(())
    }

    async fn finish(mut self) -> object_store::Result<()> {
        match self.writer.take() {
            Some(writer) => writer.finish().await.map(|_| ()),
            None => Ok(()),
        }
    }

    async fn abort(mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.abort().await {
                warn!("Failed to abort upload of {}: {}", self.key, e);
            }
        }
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Upload of {} cancelled, aborting", key);
                handle.spawn(async move {
                    if let Err(e) = writer.abort().await {
                        warn!("Failed to abort cancelled upload of {}: {}", key, e);
                    }
                });
            }
            Err(_) => warn!("Upload of {} dropped outside a runtime; parts not aborted", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::byte_channel;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use object_store::{MultipartUpload, PutPayload, PutResult, UploadPart};
    use std::io;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Multipart upload that only records an abort.
    #[derive(Debug)]
    struct RecordingUpload {
        aborted: Arc<Notify>,
    }

    #[async_trait]
    impl MultipartUpload for RecordingUpload {
        fn put_part(&mut self, _data: PutPayload) -> UploadPart {
            Box::pin(async { Ok(()) })
        }

        async fn complete(&mut self) -> object_store::Result<PutResult> {
            Err(object_store::Error::Generic {
                store: "recording",
                source: "complete is not used here".into(),
            })
        }

        async fn abort(&mut self) -> object_store::Result<()> {
            self.aborted.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_put_stores_streamed_bytes() {
        let memory = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new("tracks", memory.clone());

        let (tx, rx) = byte_channel(2);
        let producer = tokio::spawn(async move {
            for part in [&b"hello "[..], &b"world"[..]] {
                tx.send(Bytes::copy_from_slice(part)).await.unwrap();
            }
            tx.finish();
        });

        let stored = backend.put("tracks", "commit-abc.tar.gz", rx).await.unwrap();
        producer.await.unwrap();
        assert_eq!(stored, 11);

        let bytes = memory
            .get(&ObjectPath::from("commit-abc.tar.gz"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn test_poisoned_stream_leaves_no_object() {
        let memory = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new("tracks", memory.clone());

        let (tx, rx) = byte_channel(2);
        tx.send(Bytes::from_static(b"partial")).await.unwrap();
        tx.close_with_error(io::Error::new(io::ErrorKind::Other, "archive failed"));

        let err = backend.put("tracks", "commit-bad.tar.gz", rx).await.unwrap_err();
        assert!(matches!(err, StoreError::Stream { .. }));
        assert!(memory
            .head(&ObjectPath::from("commit-bad.tar.gz"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_rejected_and_releases_stream() {
        let backend = ObjectStoreBackend::new("tracks", Arc::new(InMemory::new()));
        let (tx, rx) = byte_channel(1);

        let err = backend.put("other", "k", rx).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownBucket(b) if b == "other"));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_cancelled_upload_is_aborted() {
        let aborted = Arc::new(Notify::new());
        let upload = PendingUpload::new(
            WriteMultipart::new(Box::new(RecordingUpload {
                aborted: Arc::clone(&aborted),
            })),
            "commit-slow.tar.gz",
        );

        drop(upload);
        tokio::time::timeout(Duration::from_secs(5), aborted.notified())
            .await
            .expect("dropping an unfinished upload should abort it");
    }

    #[tokio::test]
    async fn test_put_cancelled_mid_stream_leaves_no_object() {
        let memory = Arc::new(InMemory::new());
        let backend = ObjectStoreBackend::new("tracks", memory.clone());

        let (tx, rx) = byte_channel(2);
        tx.send(Bytes::from_static(b"first part")).await.unwrap();
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), backend.put("tracks", "slow", rx)).await;
        assert!(cancelled.is_err());
        drop(tx);

        tokio::task::yield_now().await;
        assert!(memory.head(&ObjectPath::from("slow")).await.is_err());
    }

    #[test]
    fn test_s3_builder_accepts_custom_endpoint() {
        let config = BackupConfig {
            s3_bucket: "tracks".to_string(),
            s3_endpoint_url: "http://localhost:9000".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: "minio".to_string(),
            aws_secret_key: "minio123".to_string(),
            ..Default::default()
        };
        let backend = ObjectStoreBackend::s3(&config).unwrap();
        assert_eq!(backend.bucket(), "tracks");
    }
}
