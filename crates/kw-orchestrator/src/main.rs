//! kernel-warmup orchestrator
//!
//! Starts a kernel server, creates a notebook session, pre-imports the
//! usual data-science stack into its kernel and then waits on the server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kw_core::config::{self, WarmupConfig};
use kw_orchestrator::{ExecutionResult, Orchestrator};

#[derive(Parser)]
#[command(name = "kw-orchestrator")]
#[command(about = "Start a kernel server and pre-warm a notebook session")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control API base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds to wait for the warm-up reply (overrides config)
    #[arg(long)]
    execute_timeout: Option<u64>,

    /// Seconds to hold before waiting on the server (overrides config)
    #[arg(long)]
    grace_period: Option<u64>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config: WarmupConfig = config::load_or_default(args.config.as_deref(), "warmup.toml")
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(secs) = args.execute_timeout {
        config.execute_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.grace_period {
        config.grace_period = Duration::from_secs(secs);
    }

    tracing::info!("kernel-warmup starting against {}", config.base_url);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut orchestrator = Orchestrator::from_config(config, cancel);
    let summary = orchestrator.run().await.context("Kernel warm-up failed")?;

    match &summary.report.execution {
        ExecutionResult::Completed(outcome) => tracing::info!(
            "Kernel {} warmed in {:.3}s",
            summary.report.kernel_id(),
            outcome.elapsed.as_secs_f64()
        ),
        ExecutionResult::TimedOut(timeout) => tracing::warn!(
            "Kernel {} did not finish warming within {:?}",
            summary.report.kernel_id(),
            timeout
        ),
    }

    match summary.exit_status.code() {
        Some(0) => Ok(()),
        Some(code) => std::process::exit(code),
        None => anyhow::bail!("Kernel server terminated by signal ({})", summary.exit_status),
    }
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
