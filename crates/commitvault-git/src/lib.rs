//! # commitvault git plumbing
//!
//! [`GitClient`] implements [`commitvault_core::RepositoryClient`] on top of the
//! `git` executable. HEAD is read straight from `.git` when possible so the
//! common case spawns nothing; everything else goes through `git -C <repo> ...`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod client;
pub mod parse;

pub use client::GitClient;
pub use parse::{is_object_id, parse_head, parse_name_status, HeadTarget};
