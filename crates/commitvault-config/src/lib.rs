//! # commitvault configuration
//!
//! Typed configuration for the commit monitor. The file is TOML and lives at
//! `~/.config/commitvault/config.toml` unless a path is given explicitly.
//!
//! Values are resolved with precedence: defaults < file < environment < caller overrides.
//!
//! ```rust,no_run
//! use commitvault_config::Config;
//!
//! # fn example() -> Result<(), commitvault_config::ConfigError> {
//! let config = Config::load(None, |_| {})?;
//! println!("watching {}", config.repository_path.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::*;
pub use loader::*;
