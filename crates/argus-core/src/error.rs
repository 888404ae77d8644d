//! Core error types for Argus.
//!
//! This module defines the central error type used by the CLI and the
//! configuration layer. Subsystem crates keep their own error enums and
//! convert at the boundary.

use thiserror::Error;

/// Central error type for Argus operations.
#[derive(Error, Debug)]
pub enum ArgusError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required input list could not be loaded
    #[error("failed to load {name} from {path}: {source}")]
    ListLoad {
        /// Logical name of the list (e.g. "sources")
        name: String,
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `ArgusError`.
pub type Result<T> = std::result::Result<T, ArgusError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
