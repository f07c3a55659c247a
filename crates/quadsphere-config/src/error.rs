//! Errors from loading, saving and validating the configuration.

use std::path::PathBuf;

/// Anything that can go wrong between `config.ron` and a usable [`crate::Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config directory or file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid RON for this schema.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// The config could not be turned into RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// A value parsed fine but is out of range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field, e.g. `terrain.detail`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// No platform config directory and none given on the command line.
    #[error("no config directory available; pass --config")]
    NoConfigDir,
}
