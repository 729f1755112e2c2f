//! Execution of a command against a kernel
//!
//! The request is sent on the shell channel and its reply awaited there,
//! while a separate task drains the iopub channel until the reply arrives
//! or the wait is abandoned.

mod correlator;
mod drain;

pub use correlator::{execute_on, ExecutionCorrelator, ExecutionOutcome};
