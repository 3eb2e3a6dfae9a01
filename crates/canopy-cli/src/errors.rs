//! Error types for the `canopy` CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for `canopy` CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid context-type JSON in {path}: {source}")]
    InvalidHostJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Diagnostics were printed; the process should still exit non-zero.
    #[error("compilation reported {count} error(s)")]
    HasErrors { count: usize },
}
