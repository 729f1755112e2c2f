//! kernel-warmup metrics monitor
//!
//! Appends host CPU, memory and network samples to a rotating JSON log
//! until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kw_core::config::{self, MonitorConfig};
use kw_monitor::{MetricsCollector, RotatingLog, Sampler};

#[derive(Parser)]
#[command(name = "kw-monitor")]
#[command(about = "Sample host metrics into a rotating JSON log")]
#[command(version)]
struct Args {
    /// Interval between metrics collection in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Log file to append samples to (overrides config)
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Size in bytes at which the log is rotated (overrides config)
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Number of rotated logs to keep (overrides config)
    #[arg(long)]
    backup_count: Option<u32>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config: MonitorConfig = config::load_or_default(args.config.as_deref(), "monitor.toml")
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(secs) = args.interval {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(path) = args.log_path {
        config.log_path = path;
    }
    if let Some(max_bytes) = args.max_bytes {
        config.max_bytes = max_bytes;
    }
    if let Some(backup_count) = args.backup_count {
        config.backup_count = backup_count;
    }

    if config.interval.is_zero() {
        anyhow::bail!("Interval must be at least one second");
    }

    let log = RotatingLog::open(&config.log_path, config.max_bytes, config.backup_count)
        .with_context(|| format!("Failed to open metrics log {:?}", config.log_path))?;

    tracing::info!(
        "Sampling every {}s into {:?} (max {} bytes, {} backups)",
        config.interval.as_secs(),
        config.log_path,
        config.max_bytes,
        config.backup_count
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut sampler = Sampler::new(MetricsCollector::new(), log, config.interval);
    sampler.run(cancel).await;

    Ok(())
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, stopping...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, stopping...");
            }
        }

        cancel.cancel();
    });
}
