//! Message identifier type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token linking a request to its reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(pub String);

impl MsgId {
    /// Generate a fresh random message ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MsgId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MsgId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
