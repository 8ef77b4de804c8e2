//! # commitvault metadata watching
//!
//! Turns filesystem activity inside a repository's `.git` directory into a single
//! "settled" signal per burst.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ MetadataWatcher │───▶│   EventStream    │───▶│    Debouncer    │───▶ on_settle()
//! │ (notify, fixed  │    │ (raw write /     │    │ (quiet interval │
//! │  directory set) │    │  create/rename)  │    │  coalescing)    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! The watch set is enumerated once at startup. Directories created afterwards are
//! not picked up; in practice git creates the interesting ones (`refs/heads`,
//! `logs`) with the first commit, before a long-running monitor starts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod debounce;
pub mod error;
mod events;
mod source;

pub use debounce::{DebounceState, Debouncer};
pub use error::*;
pub use events::{RawEvent, RawEventKind};
pub use source::{enumerate_watch_dirs, EventStream, MetadataWatcher, EXCLUDED_DIRS};
