//! Error types for the metrics monitor

use std::path::PathBuf;
use thiserror::Error;

/// Metrics monitor errors
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The log file could not be opened, written or rotated
    #[error("Log error at {path:?}: {source}")]
    Log {
        /// File being operated on
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A sample could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
