//! Kernel connection descriptor
//!
//! A running kernel writes a small JSON file describing the ports it listens
//! on and the key used to sign messages. Clients load it to open channels.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codec::WireCodec;
use crate::error::ProtocolError;

/// Contents of a kernel connection file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Address the kernel listens on
    pub ip: String,
    /// Transport (`tcp` or `ipc`)
    pub transport: String,
    /// Shell (request/reply) channel port
    pub shell_port: u16,
    /// IOPub (broadcast) channel port
    pub iopub_port: u16,
    /// Stdin channel port
    pub stdin_port: u16,
    /// Control channel port
    pub control_port: u16,
    /// Heartbeat port
    pub hb_port: u16,
    /// Message signing key
    #[serde(default)]
    pub key: String,
    /// Signature scheme, normally `hmac-sha256`
    #[serde(default)]
    pub signature_scheme: String,
    /// Kernel spec name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_name: Option<String>,
}

impl ConnectionInfo {
    /// Load a connection file from disk
    pub fn load(path: &Path) -> Result<Self, ProtocolError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Endpoint for a given port, e.g. `tcp://127.0.0.1:5555`
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}://{}:{}", self.transport, self.ip, port)
    }

    /// Shell channel endpoint
    pub fn shell_endpoint(&self) -> String {
        self.endpoint(self.shell_port)
    }

    /// IOPub channel endpoint
    pub fn iopub_endpoint(&self) -> String {
        self.endpoint(self.iopub_port)
    }

    /// Codec configured with this kernel's signing key
    pub fn codec(&self) -> Result<WireCodec, ProtocolError> {
        WireCodec::new(&self.key, &self.signature_scheme)
    }
}
