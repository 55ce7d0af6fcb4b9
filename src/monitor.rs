//! Host resource readings shown next to each prediction.

use crate::config::MonitorConfig;
use serde::Serialize;
use std::time::Duration;
use sysinfo::System;

/// Point-in-time host utilization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemSnapshot {
    /// Average CPU usage across cores, in [0, 100]
    pub cpu_percent: f32,

    /// Used memory as a share of total, in [0, 100]
    pub memory_percent: f32,
}

/// Source of host utilization samples.
pub trait HostMetrics {
    fn sample(&mut self) -> SystemSnapshot;
}

/// Host metrics read through `sysinfo`.
pub struct SystemMonitor {
    system: System,
    cpu_interval: Duration,
}

impl SystemMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            system: System::new(),
            cpu_interval: Duration::from_millis(config.cpu_sample_interval_ms)
                .max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    /// CPU usage percent in the range [0, 100].
    pub fn cpu_percent(&mut self) -> f32 {
        // sysinfo requires two refresh cycles to compute CPU usage.
        self.system.refresh_cpu();
        std::thread::sleep(self.cpu_interval);
        self.system.refresh_cpu();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return 0.0;
        }
        let sum: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
        (sum / cpus.len() as f32).clamp(0.0, 100.0)
    }

    /// Used memory percent in the range [0, 100].
    pub fn memory_percent(&mut self) -> f32 {
        self.system.refresh_memory();
        memory_percent(self.system.used_memory(), self.system.total_memory())
    }
}

impl HostMetrics for SystemMonitor {
    fn sample(&mut self) -> SystemSnapshot {
        SystemSnapshot {
            cpu_percent: self.cpu_percent(),
            memory_percent: self.memory_percent(),
        }
    }
}

fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}
