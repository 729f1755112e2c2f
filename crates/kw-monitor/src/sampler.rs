//! Periodic sampling loop

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::rotating::RotatingLog;
use crate::sample::MetricsCollector;

/// Writes one sample per interval until cancelled
pub struct Sampler {
    collector: MetricsCollector,
    log: RotatingLog,
    interval: Duration,
}

impl Sampler {
    /// Create a sampler appending to `log`
    pub fn new(collector: MetricsCollector, log: RotatingLog, interval: Duration) -> Self {
        Self {
            collector,
            log,
            interval,
        }
    }

    /// Take and write a single sample
    pub fn sample_once(&mut self) -> Result<(), MonitorError> {
        let sample = self.collector.sample();
        let line = sample.to_json()?;
        self.log.write_record(&line)?;
        tracing::trace!(
            cpus = sample.cpu.len(),
            memory = sample.memory,
            interfaces = sample.network.len(),
            "Wrote sample"
        );
        Ok(())
    }

    /// Sample every interval until `cancel` fires; returns the number of
    /// samples written
    ///
    /// The first sample is written immediately. A sample that cannot be
    /// written is logged and skipped.
    pub async fn run(&mut self, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut written = 0u64;
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => match self.sample_once() {
                    Ok(()) => written += 1,
                    Err(e) => tracing::warn!("Skipping sample: {}", e),
                },
            }
        }

        tracing::info!("Sampler stopped after {} samples", written);
        written
    }
}
