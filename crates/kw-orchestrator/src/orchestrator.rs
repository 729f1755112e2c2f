//! Warm-up sequence
//!
//! Launch, poll, bootstrap, discover and execute run strictly in order,
//! each consuming the output of the previous step. Only the execution
//! timeout is tolerated; every other failure terminates the run. The
//! launched server is detached, so it keeps running after a fatal error
//! or a cancellation.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use kw_core::config::WarmupConfig;
use kw_core::traits::KernelConnector;
use kw_core::types::{KernelId, SessionDescriptor};
use kw_core::{SessionStore, WarmupError, WarmupPhase};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::SessionBootstrapper;
use crate::discovery::locate_connection_file;
use crate::execution::{ExecutionCorrelator, ExecutionOutcome};
use crate::kernel::ZmqConnector;
use crate::readiness::{HttpStatusProbe, Readiness, ReadinessPoller, StatusProbe};
use crate::state::PhaseTracker;
use crate::supervisor::ProcessSupervisor;

/// How the warm-up command ended
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// A correlated reply arrived (its status may still be `error`)
    Completed(ExecutionOutcome),
    /// No reply within the timeout
    TimedOut(Duration),
}

/// What the warm-up sequence produced
#[derive(Debug, Clone)]
pub struct WarmupReport {
    /// Readiness poll result
    pub readiness: Readiness,
    /// Created session
    pub session: SessionDescriptor,
    /// Kernel connection file used
    pub connection_file: PathBuf,
    /// Warm-up command result
    pub execution: ExecutionResult,
}

impl WarmupReport {
    /// Kernel started for the session
    pub fn kernel_id(&self) -> &KernelId {
        self.session.kernel_id()
    }
}

/// Outcome of a full run
#[derive(Debug)]
pub struct RunSummary {
    /// Warm-up report
    pub report: WarmupReport,
    /// Exit status of the kernel server
    pub exit_status: ExitStatus,
}

/// Drives the warm-up sequence
pub struct Orchestrator<P, C> {
    config: WarmupConfig,
    client: reqwest::Client,
    probe: P,
    connector: C,
    phase: PhaseTracker,
    cancel: CancellationToken,
}

impl Orchestrator<HttpStatusProbe, ZmqConnector> {
    /// Orchestrator probing the configured control API over HTTP and
    /// talking to the kernel over ZeroMQ
    pub fn from_config(config: WarmupConfig, cancel: CancellationToken) -> Self {
        let client = reqwest::Client::new();
        let probe = HttpStatusProbe::new(client.clone(), config.status_url());
        let connector = ZmqConnector::with_connect_timeout(config.connect_timeout);
        Self::new(config, client, probe, connector, cancel)
    }
}

impl<P, C> Orchestrator<P, C>
where
    P: StatusProbe,
    C: KernelConnector,
{
    /// Create an orchestrator with explicit collaborators
    pub fn new(
        config: WarmupConfig,
        client: reqwest::Client,
        probe: P,
        connector: C,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            client,
            probe,
            connector,
            phase: PhaseTracker::new(),
            cancel,
        }
    }

    /// Current phase
    pub fn phase(&self) -> WarmupPhase {
        self.phase.phase()
    }

    /// Run the whole sequence and wait for the server to exit
    pub async fn run(&mut self) -> Result<RunSummary, WarmupError> {
        match self.run_inner().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!("Warm-up failed during {}: {}", self.phase.phase(), e);
                self.phase.terminate();
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunSummary, WarmupError> {
        let mut server = ProcessSupervisor::launch(&self.config.server)?;
        self.phase.advance(WarmupPhase::ProcessStarted)?;

        let report = self.warm_up().await?;

        self.phase.advance(WarmupPhase::Draining)?;
        self.hold().await?;

        let exit_status = self.cancellable(server.wait()).await??;
        self.phase.advance(WarmupPhase::Terminated)?;

        Ok(RunSummary {
            report,
            exit_status,
        })
    }

    /// Steps between launch and the grace period
    async fn warm_up(&mut self) -> Result<WarmupReport, WarmupError> {
        let poller = ReadinessPoller::new(self.config.poll_interval, self.config.poll_log_every);
        let readiness = self
            .cancellable(poller.wait_until_ready(&self.probe))
            .await?;
        self.phase.advance(WarmupPhase::Ready)?;

        let bootstrapper = SessionBootstrapper::new(
            self.client.clone(),
            self.config.sessions_url(),
            SessionStore::new(self.config.artifact_dir.clone()),
        );
        let session = self
            .cancellable(bootstrapper.create_session(&self.config.session.to_request()))
            .await??;
        self.phase.advance(WarmupPhase::SessionCreated)?;

        let connection_file =
            locate_connection_file(&self.config.runtime_dir, &self.config.connection_pattern)?;
        self.phase.advance(WarmupPhase::ConnectionResolved)?;

        let correlator = ExecutionCorrelator::new(&self.connector);
        let execution = match correlator
            .execute_and_await(
                &connection_file,
                &self.config.warmup_command,
                self.config.execute_timeout,
            )
            .await
        {
            Ok(outcome) => {
                log_outcome(&outcome);
                ExecutionResult::Completed(outcome)
            }
            Err(e) if e.is_degraded() => {
                tracing::warn!("Continuing without a warm kernel: {}", e);
                ExecutionResult::TimedOut(self.config.execute_timeout)
            }
            Err(e) => return Err(e),
        };
        self.phase.advance(WarmupPhase::Warmed)?;

        Ok(WarmupReport {
            readiness,
            session,
            connection_file,
            execution,
        })
    }

    /// Hold for the grace period
    async fn hold(&self) -> Result<(), WarmupError> {
        tracing::info!(
            "Holding for {:.0}s before waiting on the kernel server",
            self.config.grace_period.as_secs_f64()
        );
        self.cancellable(tokio::time::sleep(self.config.grace_period))
            .await
    }

    /// Run `step` unless shutdown is requested first
    async fn cancellable<F: Future>(&self, step: F) -> Result<F::Output, WarmupError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("Shutdown requested during {}", self.phase.phase());
                Err(WarmupError::Cancelled {
                    phase: self.phase.phase(),
                })
            }
            output = step => Ok(output),
        }
    }
}

fn log_outcome(outcome: &ExecutionOutcome) {
    match outcome.status() {
        Some("error") => {
            let content = &outcome.reply.content;
            tracing::warn!(
                ename = content["ename"].as_str().unwrap_or(""),
                evalue = content["evalue"].as_str().unwrap_or(""),
                "Warm-up command raised after {:.3}s",
                outcome.elapsed.as_secs_f64()
            );
        }
        status => {
            tracing::info!(
                "Warm-up command finished with status {} in {:.3}s",
                status.unwrap_or("unknown"),
                outcome.elapsed.as_secs_f64()
            );
        }
    }
}
