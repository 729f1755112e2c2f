//! Readiness polling of the control API
//!
//! Kernel server startup time is unbounded and depends on the host, so the
//! poller probes a cheap status endpoint until it answers rather than
//! sleeping for a fixed delay. There is no failure exit: the poll only ends
//! when a probe succeeds.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Why a probe did not count as ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Request could not be sent or no response arrived
    Transport(String),
    /// Server answered with a non-success status
    Status(u16),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "transport error: {}", reason),
            Self::Status(status) => write!(f, "HTTP {}", status),
        }
    }
}

/// A single readiness check
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Probe once; `Ok` means ready
    async fn probe(&self) -> Result<(), ProbeFailure>;
}

/// Probe issuing `GET` against the control API status path
#[derive(Debug, Clone)]
pub struct HttpStatusProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpStatusProbe {
    /// Create a probe for `url`
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// URL being probed
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn probe(&self) -> Result<(), ProbeFailure> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProbeFailure::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeFailure::Status(response.status().as_u16()))
        }
    }
}

/// Result of a completed poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// Probes issued, including the successful one
    pub attempts: u32,
    /// Time from first probe to success
    pub elapsed: Duration,
}

/// Polls a [`StatusProbe`] until it succeeds
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    interval: Duration,
    log_every: u32,
}

impl ReadinessPoller {
    /// Create a poller sleeping `interval` between probes and logging every
    /// `log_every` failed attempts
    pub fn new(interval: Duration, log_every: u32) -> Self {
        Self {
            interval,
            log_every: log_every.max(1),
        }
    }

    /// Block until `probe` succeeds
    pub async fn wait_until_ready<P>(&self, probe: &P) -> Readiness
    where
        P: StatusProbe + ?Sized,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            match probe.probe().await {
                Ok(()) => break,
                Err(failure) => {
                    tracing::trace!("Readiness probe {} failed: {}", attempts, failure);
                }
            }

            if attempts % self.log_every == 0 {
                tracing::info!("Waiting for kernel server to start...");
            }
            tokio::time::sleep(self.interval).await;
        }

        let elapsed = start.elapsed();
        tracing::info!(
            "Kernel server ready after {} attempts ({:.3}s)",
            attempts,
            elapsed.as_secs_f64()
        );
        Readiness { attempts, elapsed }
    }
}
