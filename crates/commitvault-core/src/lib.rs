//! # commitvault core
//!
//! Commit detection and snapshot upload for a single monitored repository.
//!
//! ```text
//! settle signal ──▶ Processor::check ──▶ RepositorySession (advance / rollback)
//!                        │
//!                        ├──▶ Validator
//!                        └──▶ ArchivePipeline: archive ─▶ gzip task ─▶ byte_channel ─▶ ObjectStore::put
//! ```
//!
//! Repository access, policy checking and storage are consumed through the
//! traits in [`traits`]; `commitvault-git` and `commitvault-policy` provide the
//! production implementations, [`ObjectStoreBackend`] the storage one.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod channel;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod processor;
pub mod session;
pub mod store;
pub mod token;
pub mod traits;

pub use channel::{byte_channel, ByteReceiver, ByteSender, ChannelClosed};
pub use error::{MonitorError, PipelineError, PipelineResult, RepoError, StoreError};
pub use monitor::Monitor;
pub use pipeline::{object_key, ArchivePipeline, UploadReport};
pub use processor::{CycleOutcome, Processor};
pub use session::{RepositorySession, Transition};
pub use store::ObjectStoreBackend;
pub use token::{ProcessingToken, TokenGuard};
pub use traits::{
    ArchiveSource, ObjectStore, RepositoryClient, SourceProcess, ValidationReport, Validator,
};
