//! Kernel connection file discovery
//!
//! A freshly started kernel writes one connection file into the runtime
//! directory. Finding none means the kernel has not started; finding more
//! than one means another kernel (or a stale file from an unclean run) is
//! present. Both are fatal.

use std::path::{Path, PathBuf};

use kw_core::{ConfigError, WarmupError};

/// Locate the single file matching `pattern` in `runtime_dir`
pub fn locate_connection_file(runtime_dir: &Path, pattern: &str) -> Result<PathBuf, WarmupError> {
    let escaped_dir = glob::Pattern::escape(&runtime_dir.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped_dir.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full_pattern).map_err(|e| {
        ConfigError::Invalid(format!("Invalid connection pattern {:?}: {}", pattern, e))
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => tracing::warn!("Unreadable entry in {:?}: {}", runtime_dir, e),
        }
    }

    if matches.len() != 1 {
        return Err(WarmupError::AmbiguousOrMissingConnection {
            dir: runtime_dir.to_path_buf(),
            pattern: pattern.to_string(),
            found: matches.len(),
        });
    }

    let path = matches.remove(0);
    tracing::info!("Found kernel connection file {:?}", path);
    Ok(path)
}
