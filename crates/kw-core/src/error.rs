//! Core error types for kernel-warmup

use kw_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::WarmupPhase;

/// Top-level error type for the warm-up sequence
#[derive(Error, Debug)]
pub enum WarmupError {
    /// Session-creation response was malformed or in an unexpected state
    #[error("Protocol violation: {reason} (HTTP {status}, body: {body})")]
    ProtocolViolation {
        /// HTTP status of the response
        status: u16,
        /// Raw response body
        body: String,
        /// What was wrong with it
        reason: String,
    },

    /// Zero or several kernel connection files in the runtime directory
    #[error("Expected exactly one connection file matching {pattern:?} in {dir:?}, found {found}")]
    AmbiguousOrMissingConnection {
        /// Directory searched
        dir: PathBuf,
        /// Glob pattern used
        pattern: String,
        /// Number of matches
        found: usize,
    },

    /// No correlated reply within the deadline
    #[error("No execute reply within {timeout:?}")]
    Timeout {
        /// The deadline that expired
        timeout: Duration,
    },

    /// Kernel channel error
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Control API transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session artifact could not be written
    #[error("Failed to persist {path:?}: {source}")]
    Persist {
        /// File being written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Kernel server process error
    #[error("Process error: {0}")]
    Process(String),

    /// Orchestrator attempted an illegal phase change
    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current phase
        from: WarmupPhase,
        /// Requested phase
        to: WarmupPhase,
    },

    /// Shutdown was requested before the run finished
    #[error("Cancelled during {phase}")]
    Cancelled {
        /// Phase the run had reached
        phase: WarmupPhase,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WarmupError {
    /// Build a protocol violation for a session-creation response
    pub fn protocol_violation(
        status: u16,
        body: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProtocolViolation {
            status,
            body: body.into(),
            reason: reason.into(),
        }
    }

    /// Whether the orchestrator may continue after this error
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Kernel channel errors
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Could not connect to a channel endpoint
    #[error("Failed to open {channel} channel at {endpoint}: {reason}")]
    Open {
        /// Channel name (`shell`, `iopub`)
        channel: &'static str,
        /// Endpoint that was dialed
        endpoint: String,
        /// Transport error text
        reason: String,
    },

    /// Send or receive failed on an open channel
    #[error("Transport error on {channel} channel: {reason}")]
    Transport {
        /// Channel name
        channel: &'static str,
        /// Transport error text
        reason: String,
    },

    /// Peer went away
    #[error("{0} channel closed")]
    Closed(&'static str),

    /// Channels did not shut down cleanly
    #[error("Failed to close channels: {0}")]
    Close(String),

    /// Message could not be encoded, decoded or verified
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violation_message_carries_context() {
        let err = WarmupError::protocol_violation(500, r#"{"message":"boom"}"#, "missing kernel");
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
        assert!(text.contains("missing kernel"));
    }

    #[test]
    fn test_only_timeout_is_degraded() {
        assert!(WarmupError::Timeout {
            timeout: Duration::from_secs(60)
        }
        .is_degraded());
        assert!(!WarmupError::Channel(ChannelError::Closed("shell")).is_degraded());
        assert!(!WarmupError::AmbiguousOrMissingConnection {
            dir: PathBuf::from("/tmp"),
            pattern: "kernel-*.json".to_string(),
            found: 0,
        }
        .is_degraded());
        assert!(!WarmupError::Cancelled {
            phase: WarmupPhase::Ready
        }
        .is_degraded());
    }

    #[test]
    fn test_cancelled_names_phase() {
        let err = WarmupError::Cancelled {
            phase: WarmupPhase::Draining,
        };
        assert_eq!(err.to_string(), format!("Cancelled during {}", WarmupPhase::Draining));
    }
}
