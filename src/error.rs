//! Fatal error types.
//!
//! Only the "Setup" row of the error taxonomy produces a `Result::Err`; every
//! other recoverable condition (unknown opcode, out-of-range switch target,
//! missing symbol) is a logged `tracing` event and the run continues.

use std::path::PathBuf;

/// Fatal errors that abort a recompilation run.
#[derive(Debug, thiserror::Error)]
pub enum RecompError {
    /// The executable image could not be parsed by the image loader.
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        /// Path to the image that failed to load.
        path: PathBuf,
        /// Underlying loader error, opaque since the loader is out of scope.
        #[source]
        source: anyhow::Error,
    },

    /// The switch-table side-channel document failed to parse.
    #[error("failed to parse switch table {path}: {source}")]
    SwitchTableParse {
        /// Path to the switch-table document.
        path: PathBuf,
        /// Underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// The config document failed to parse.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        /// Path to the config document.
        path: PathBuf,
        /// Underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// Writing an output file failed.
    #[error("failed to write output file {path}: {source}")]
    OutputWrite {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for fallible setup/driver operations.
pub type Result<T, E = RecompError> = std::result::Result<T, E>;
