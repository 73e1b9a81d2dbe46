//! Error types for tql configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toml::{de, ser};
use tql_query::OptionsError;

/// Errors that can occur when loading or processing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// The merged settings do not make a usable parser.
    #[error("invalid query syntax in {}: {source}", origin.display())]
    InvalidOptions {
        /// The most specific config file that contributed to the settings.
        origin: PathBuf,
        /// What the parser rejected.
        source: OptionsError,
    },

    /// Failed to write the effective configuration back out as TOML.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ser::Error),
}
