//! kw-core: Core abstractions and configuration for kernel-warmup
//!
//! This crate provides the shared types, error taxonomy, configuration
//! structures and kernel-channel traits used by the orchestrator and the
//! metrics monitor.

pub mod config;
pub mod error;
pub mod store;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{ChannelError, ConfigError, WarmupError};
pub use store::SessionStore;
pub use types::{KernelId, SessionDescriptor, SessionRequest, WarmupPhase};
