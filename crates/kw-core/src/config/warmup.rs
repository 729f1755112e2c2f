//! Warm-up orchestrator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::home_dir;
use super::serde_utils::{duration_millis, duration_secs};
use crate::types::SessionRequest;

/// Imports run against a fresh kernel so later users find them cached
pub const DEFAULT_WARMUP_COMMAND: &str = "
import matplotlib
import numpy
import matplotlib.pyplot
import pandas
import seaborn
import sklearn
";

/// Configuration for the warm-up orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Base URL of the kernel server's control API
    pub base_url: String,

    /// Delay between readiness probes
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Log a "still waiting" message every this many failed probes
    pub poll_log_every: u32,

    /// Directory receiving `kernel_id` and `.session_info`
    pub artifact_dir: PathBuf,

    /// Directory the kernel writes its connection file to
    pub runtime_dir: PathBuf,

    /// Glob pattern of kernel connection files within `runtime_dir`
    pub connection_pattern: String,

    /// Code executed to pre-warm the kernel
    pub warmup_command: String,

    /// How long to wait for each kernel channel to connect
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// How long to wait for the warm-up reply
    #[serde(with = "duration_secs")]
    pub execute_timeout: Duration,

    /// How long to hold open after warming before waiting on the server
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,

    /// Session to create
    pub session: SessionSettings,

    /// Kernel server command line
    pub server: ServerCommand,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        let home = home_dir();

        Self {
            base_url: "http://localhost:8888".to_string(),
            poll_interval: Duration::from_millis(100),
            poll_log_every: 20,
            artifact_dir: home.join(".jupyter"),
            runtime_dir: home.join(".local").join("share").join("jupyter").join("runtime"),
            connection_pattern: "kernel-*.json".to_string(),
            warmup_command: DEFAULT_WARMUP_COMMAND.to_string(),
            connect_timeout: Duration::from_secs(10),
            execute_timeout: Duration::from_secs(60),
            grace_period: Duration::from_secs(100),
            session: SessionSettings::default(),
            server: ServerCommand::default(),
        }
    }
}

impl WarmupConfig {
    /// URL of the readiness probe
    pub fn status_url(&self) -> String {
        format!("{}/api/status", self.base_url.trim_end_matches('/'))
    }

    /// URL of the session-creation endpoint
    pub fn sessions_url(&self) -> String {
        format!("{}/api/sessions", self.base_url.trim_end_matches('/'))
    }
}

/// Parameters of the session to create
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Working directory of the session
    pub path: PathBuf,
    /// Kernel spec name
    pub kernel_name: String,
    /// Session name
    pub name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            path: home_dir(),
            kernel_name: "python3".to_string(),
            name: "default".to_string(),
        }
    }
}

impl SessionSettings {
    /// Build the creation request body
    pub fn to_request(&self) -> SessionRequest {
        SessionRequest::notebook(
            self.path.to_string_lossy(),
            self.kernel_name.clone(),
            self.name.clone(),
        )
    }
}

/// Command line of the kernel server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerCommand {
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
}

impl Default for ServerCommand {
    fn default() -> Self {
        Self {
            program: "jupyter".to_string(),
            // Empty token disables control API authentication
            args: vec!["server".to_string(), "--IdentityProvider.token=".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WarmupConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.poll_log_every, 20);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.execute_timeout, Duration::from_secs(60));
        assert!(config.runtime_dir.ends_with(".local/share/jupyter/runtime"));
        assert!(config.artifact_dir.ends_with(".jupyter"));
        assert!(config.warmup_command.contains("import pandas"));
        assert_eq!(config.server.program, "jupyter");
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let config = WarmupConfig {
            base_url: "http://localhost:8888/".to_string(),
            ..WarmupConfig::default()
        };
        assert_eq!(config.status_url(), "http://localhost:8888/api/status");
        assert_eq!(config.sessions_url(), "http://localhost:8888/api/sessions");
    }

    #[test]
    fn test_session_request_from_settings() {
        let settings = SessionSettings {
            path: PathBuf::from("/work"),
            kernel_name: "python3".to_string(),
            name: "default".to_string(),
        };
        let request = settings.to_request();
        assert_eq!(request.path, "/work");
        assert_eq!(request.session_type, "notebook");
    }
}
