//! Metrics monitor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::home_dir;
use super::serde_utils::duration_secs;

/// Configuration for the metrics monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Active log file; rotations are written next to it as `.1`, `.2`, ...
    pub log_path: PathBuf,

    /// Size at which the log is rotated
    pub max_bytes: u64,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Time between samples
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_path: home_dir().join("metrics_log.json"),
            max_bytes: 200 * 1024 * 1024,
            backup_count: 2,
            interval: Duration::from_secs(1),
        }
    }
}
