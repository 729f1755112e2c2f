//! Host metric sampling

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, Networks, RefreshKind, System};

use kw_core::time::current_time_secs_f64;

/// Cumulative counters of one network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCounters {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_recv: u64,
    /// Packets sent
    pub packets_sent: u64,
    /// Packets received
    pub packets_recv: u64,
    /// Receive errors
    pub errin: u64,
    /// Transmit errors
    pub errout: u64,
}

/// One line of the metrics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Unix time in fractional seconds
    pub timestamp: f64,
    /// Usage percentage of each logical CPU since the previous sample
    pub cpu: Vec<f32>,
    /// Percentage of memory not available to new allocations
    pub memory: f32,
    /// Counters keyed by interface name
    pub network: BTreeMap<String, NetCounters>,
}

impl MetricsSample {
    /// Encode as a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Collects [`MetricsSample`]s
///
/// CPU usage is measured between consecutive refreshes, so the first
/// sample after construction reports usage since construction.
pub struct MetricsCollector {
    system: System,
    networks: Networks,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a collector and take the baseline CPU reading
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Refresh and read the current metrics
    pub fn sample(&mut self) -> MetricsSample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.networks.refresh();

        let cpu = self.system.cpus().iter().map(|c| c.cpu_usage()).collect();

        let network = self
            .networks
            .list()
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    NetCounters {
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                        packets_sent: data.total_packets_transmitted(),
                        packets_recv: data.total_packets_received(),
                        errin: data.total_errors_on_received(),
                        errout: data.total_errors_on_transmitted(),
                    },
                )
            })
            .collect();

        MetricsSample {
            timestamp: current_time_secs_f64(),
            cpu,
            memory: memory_percent(self.system.total_memory(), self.system.available_memory()),
            network,
        }
    }
}

fn memory_percent(total: u64, available: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(available);
    ((used as f64 / total as f64) * 100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(0, 0), 0.0);
        assert_eq!(memory_percent(1000, 1000), 0.0);
        assert_eq!(memory_percent(1000, 250), 75.0);
        assert_eq!(memory_percent(1000, 2000), 0.0);
    }

    #[test]
    fn test_sample_shape() {
        let mut collector = MetricsCollector::new();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let sample = collector.sample();

        assert!(sample.timestamp > 0.0);
        assert!(!sample.cpu.is_empty());
        assert!(sample.cpu.iter().all(|c| (0.0..=100.0).contains(c)));
        assert!((0.0..=100.0).contains(&sample.memory));
    }

    #[test]
    fn test_json_line_layout() {
        let mut network = BTreeMap::new();
        network.insert(
            "eth0".to_string(),
            NetCounters {
                bytes_sent: 10,
                bytes_recv: 20,
                packets_sent: 1,
                packets_recv: 2,
                errin: 0,
                errout: 0,
            },
        );
        let sample = MetricsSample {
            timestamp: 1700000000.5,
            cpu: vec![12.5, 0.0],
            memory: 41.0,
            network,
        };

        let line = sample.to_json().unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["timestamp"], 1700000000.5);
        assert_eq!(value["cpu"][0], 12.5);
        assert_eq!(value["memory"], 41.0);
        assert_eq!(value["network"]["eth0"]["bytes_recv"], 20);
    }
}
