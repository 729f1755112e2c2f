//! Protocol error types

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// No `<IDS|MSG>` delimiter among the frames
    #[error("Missing message delimiter")]
    MissingDelimiter,

    /// Fewer frames than a message requires
    #[error("Incomplete message: expected {expected} frames after delimiter, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// Signature did not match the message contents
    #[error("Invalid message signature")]
    InvalidSignature,

    /// Signature scheme other than hmac-sha256
    #[error("Unsupported signature scheme: {0}")]
    UnsupportedSignatureScheme(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
