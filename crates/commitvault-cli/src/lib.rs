//! commitvault command-line interface.
//!
//! The binary wires the git client, naming policy and S3 store into a
//! [`commitvault_core::Monitor`]; the modules here are exposed for tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
