//! Configuration management for kernel-warmup

mod monitor;
pub mod serde_utils;
mod warmup;

pub use monitor::MonitorConfig;
pub use warmup::{ServerCommand, SessionSettings, WarmupConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kernel-warmup")
}

/// Get the user's home directory, falling back to the current directory
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load configuration from `path`, or from `default_config_dir()/file_name`
/// when no path is given.
///
/// An explicit path must load. A missing or unreadable default file falls
/// back to `T::default()`.
pub fn load_or_default<T>(path: Option<&Path>, file_name: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if let Some(path) = path {
        return load_config(path);
    }

    let default_path = default_config_dir().join(file_name);
    if !default_path.exists() {
        tracing::info!("Using default configuration");
        return Ok(T::default());
    }

    Ok(load_config(&default_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
        T::default()
    }))
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_warmup_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("warmup.toml");

        let mut config = WarmupConfig::default();
        config.base_url = "http://127.0.0.1:9999".to_string();
        config.execute_timeout = Duration::from_secs(5);
        save_config(&path, &config).unwrap();

        let loaded: WarmupConfig = load_config(&path).unwrap();
        assert_eq!(loaded.base_url, "http://127.0.0.1:9999");
        assert_eq!(loaded.execute_timeout, Duration::from_secs(5));
        assert_eq!(loaded.poll_interval, config.poll_interval);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result: Result<WarmupConfig, _> = load_config(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let result: Result<MonitorConfig, _> = load_or_default(Some(&path), "monitor.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.toml");
        std::fs::write(&path, "backup_count = 5\n").unwrap();

        let config: MonitorConfig = load_config(&path).unwrap();
        assert_eq!(config.backup_count, 5);
        assert_eq!(config.max_bytes, MonitorConfig::default().max_bytes);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "base_url = [").unwrap();
        let result: Result<WarmupConfig, _> = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
