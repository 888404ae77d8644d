//! Argus Core - Foundation crate for the Argus username scanner.
//!
//! This crate provides the shared types, list-file parsing, error handling and
//! configuration management that the LLM, scanner and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared domain types (`Source`, `ProbeJob`) and username expansion
//! - [`lists`] - Parsers for the newline-delimited input lists
//!
//! # Example
//!
//! ```rust
//! use argus_core::{lists, AppConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.scan.threads, 25);
//!
//! let sources = lists::parse_sources("https://site.test/{U}\n# comment\n");
//! assert_eq!(sources.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod lists;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DataFiles, LlmConfig, OutputConfig, ProxyConfig, ScanConfig};
pub use error::{ArgusError, ConfigError, ConfigResult, Result};
pub use types::{expand_usernames, ProbeJob, Source, USERNAME_PLACEHOLDER};
