//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WarmupError;

/// Execution state a freshly created kernel must report
pub const EXECUTION_STATE_STARTING: &str = "starting";

/// Session type tag sent on creation
pub const NOTEBOOK_SESSION_TYPE: &str = "notebook";

/// Server-assigned kernel identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(pub String);

impl KernelId {
    /// Create a new kernel ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kernel spec reference in a session-creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpecRef {
    /// Kernel spec name, e.g. `python3`
    pub name: String,
}

/// Body of `POST /api/sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Working directory of the session
    pub path: String,
    /// Kernel to start
    pub kernel: KernelSpecRef,
    /// Session type tag
    #[serde(rename = "type")]
    pub session_type: String,
    /// Human-facing session name
    pub name: String,
}

impl SessionRequest {
    /// Create a notebook session request
    pub fn notebook(
        path: impl Into<String>,
        kernel_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kernel: KernelSpecRef {
                name: kernel_name.into(),
            },
            session_type: NOTEBOOK_SESSION_TYPE.to_string(),
            name: name.into(),
        }
    }
}

/// Kernel model embedded in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelModel {
    /// Kernel identifier
    pub id: KernelId,
    /// Kernel spec name
    #[serde(default)]
    pub name: String,
    /// Execution state at the time of the response
    pub execution_state: String,
}

/// A created session, as returned by the control API
///
/// Only constructed through [`SessionDescriptor::from_response`], which
/// rejects any kernel not in the `starting` state. Only `kernel.id` and
/// `kernel.execution_state` are required in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    #[serde(default)]
    id: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    session_type: String,
    kernel: KernelModel,
}

impl SessionDescriptor {
    /// Parse and validate a session-creation response
    pub fn from_response(status: u16, body: &str) -> Result<Self, WarmupError> {
        if !(200..300).contains(&status) {
            return Err(WarmupError::protocol_violation(
                status,
                body,
                "session creation was not accepted",
            ));
        }

        let descriptor: SessionDescriptor = serde_json::from_str(body).map_err(|e| {
            WarmupError::protocol_violation(status, body, format!("malformed session: {}", e))
        })?;

        if descriptor.kernel.execution_state != EXECUTION_STATE_STARTING {
            return Err(WarmupError::protocol_violation(
                status,
                body,
                format!(
                    "kernel execution_state is {:?}, expected {:?}",
                    descriptor.kernel.execution_state, EXECUTION_STATE_STARTING
                ),
            ));
        }

        Ok(descriptor)
    }

    /// Server-assigned session ID, empty if the server sent none
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Working directory of the session
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session type tag
    pub fn session_type(&self) -> &str {
        &self.session_type
    }

    /// Kernel bound to this session
    pub fn kernel(&self) -> &KernelModel {
        &self.kernel
    }

    /// Shortcut for the kernel ID
    pub fn kernel_id(&self) -> &KernelId {
        &self.kernel.id
    }
}

/// Orchestration phase
///
/// Phases only move forward one step at a time; any phase may fall to
/// `Terminated` on a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarmupPhase {
    /// Nothing started yet
    Idle,
    /// Kernel server process launched
    ProcessStarted,
    /// Control API answered a status probe
    Ready,
    /// Session created and persisted
    SessionCreated,
    /// Connection file located
    ConnectionResolved,
    /// Warm-up command completed or timed out
    Warmed,
    /// Holding the server open before waiting for exit
    Draining,
    /// Done, successfully or not
    Terminated,
}

impl WarmupPhase {
    /// The phase that follows this one on the success path
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::ProcessStarted),
            Self::ProcessStarted => Some(Self::Ready),
            Self::Ready => Some(Self::SessionCreated),
            Self::SessionCreated => Some(Self::ConnectionResolved),
            Self::ConnectionResolved => Some(Self::Warmed),
            Self::Warmed => Some(Self::Draining),
            Self::Draining => Some(Self::Terminated),
            Self::Terminated => None,
        }
    }

    /// Whether moving from `self` to `to` is allowed
    pub fn can_transition_to(self, to: WarmupPhase) -> bool {
        self.successor() == Some(to) || (to == Self::Terminated && self != Self::Terminated)
    }
}

impl fmt::Display for WarmupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
