//! Orchestration phase tracking

use kw_core::{WarmupError, WarmupPhase};

/// Tracks the current phase and rejects illegal transitions
#[derive(Debug)]
pub struct PhaseTracker {
    phase: WarmupPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    /// Start in [`WarmupPhase::Idle`]
    pub fn new() -> Self {
        Self {
            phase: WarmupPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> WarmupPhase {
        self.phase
    }

    /// Move to `to` if it is the successor of the current phase, or
    /// `Terminated`
    pub fn advance(&mut self, to: WarmupPhase) -> Result<(), WarmupError> {
        if !self.phase.can_transition_to(to) {
            return Err(WarmupError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Move to `Terminated` unless already there
    pub fn terminate(&mut self) {
        if self.phase != WarmupPhase::Terminated {
            tracing::debug!("Phase {} -> {}", self.phase, WarmupPhase::Terminated);
            self.phase = WarmupPhase::Terminated;
        }
    }

    /// Whether the run has finished
    pub fn is_terminated(&self) -> bool {
        self.phase == WarmupPhase::Terminated
    }
}
