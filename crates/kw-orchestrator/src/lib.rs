//! kw-orchestrator: Kernel server bootstrap and pre-warming
//!
//! The orchestrator launches a kernel-hosting server, waits for its control
//! API to answer, creates a notebook session, locates the kernel's
//! connection file and runs a warm-up command against the kernel, then
//! holds the server open until it exits.

pub mod bootstrap;
pub mod discovery;
pub mod execution;
pub mod kernel;
pub mod orchestrator;
pub mod readiness;
pub mod state;
pub mod supervisor;

pub use bootstrap::SessionBootstrapper;
pub use discovery::locate_connection_file;
pub use execution::{ExecutionCorrelator, ExecutionOutcome};
pub use orchestrator::{ExecutionResult, Orchestrator, RunSummary, WarmupReport};
pub use readiness::{HttpStatusProbe, ProbeFailure, Readiness, ReadinessPoller, StatusProbe};
pub use state::PhaseTracker;
pub use supervisor::ProcessSupervisor;
