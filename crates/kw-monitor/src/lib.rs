//! kw-monitor: Host metrics sampler for kernel-warmup
//!
//! Samples per-core CPU usage, memory usage and per-interface network
//! counters at a fixed interval and appends each sample as one JSON line to
//! a size-capped, rotating log.

pub mod error;
pub mod rotating;
pub mod sample;
pub mod sampler;

pub use error::MonitorError;
pub use rotating::RotatingLog;
pub use sample::{MetricsCollector, MetricsSample, NetCounters};
pub use sampler::Sampler;
