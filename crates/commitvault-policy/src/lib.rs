//! # commitvault naming policy
//!
//! [`NamingPolicy`] is the [`commitvault_core::Validator`] used by the monitor.
//! The path rules themselves live in [`rules`] and need no repository access.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod rules;
mod validator;

pub use rules::{check_path, is_project_folder};
pub use validator::{NamingPolicy, REQUIRED_FILES};
