//! Host and process resource sampling.
//!
//! [`SystemMonitor`] keeps one `sysinfo::System` alive between samples so
//! CPU usage can be computed as a delta. Sampling is blocking work and runs
//! on the blocking thread pool.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sysinfo::{Components, Pid, ProcessesToUpdate, System};
use thiserror::Error;

/// Errors raised while sampling.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The collector could not produce a sample.
    #[error("system metrics unavailable: {0}")]
    Unavailable(String),
}

/// CPU part of a [`SystemInfo`] sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    /// Global usage in percent
    pub usage: f32,
    /// Degrees Celsius, when a CPU sensor is exposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Memory part of a [`SystemInfo`] sample. Sizes are in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

/// One host sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

/// Memory held by the daemon process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProcessMemory {
    pub rss: u64,
    #[serde(rename = "virtual")]
    pub virtual_memory: u64,
}

struct MonitorState {
    system: System,
    pid: Pid,
}

/// Shared sampler for host CPU, memory and temperature.
#[derive(Clone)]
pub struct SystemMonitor {
    inner: Arc<Mutex<MonitorState>>,
}

impl std::fmt::Debug for SystemMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMonitor").finish_non_exhaustive()
    }
}

impl SystemMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Baseline for the first CPU delta
        system.refresh_cpu_usage();

        Self {
            inner: Arc::new(Mutex::new(MonitorState { system, pid })),
        }
    }

    /// Samples host CPU, memory and temperature.
    pub async fn sample(&self) -> Result<SystemInfo, MetricsError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut state = inner
                .lock()
                .map_err(|_| MetricsError::Unavailable("collector poisoned".to_string()))?;
            sample_host(&mut state.system)
        })
        .await
        .map_err(|e| MetricsError::Unavailable(format!("sampling task failed: {e}")))?
    }

    /// Memory held by this process.
    pub async fn process_memory(&self) -> Result<ProcessMemory, MetricsError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut state = inner
                .lock()
                .map_err(|_| MetricsError::Unavailable("collector poisoned".to_string()))?;
            let pid = state.pid;
            state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
            let process = state
                .system
                .process(pid)
                .ok_or_else(|| MetricsError::Unavailable("own process not found".to_string()))?;
            Ok(ProcessMemory {
                rss: process.memory(),
                virtual_memory: process.virtual_memory(),
            })
        })
        .await
        .map_err(|e| MetricsError::Unavailable(format!("sampling task failed: {e}")))?
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_host(system: &mut System) -> Result<SystemInfo, MetricsError> {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let total = system.total_memory();
    if total == 0 {
        return Err(MetricsError::Unavailable("memory totals not reported".to_string()));
    }
    let used = system.used_memory();

    Ok(SystemInfo {
        cpu: CpuInfo {
            usage: system.global_cpu_usage(),
            temperature: cpu_temperature(),
        },
        memory: MemoryInfo {
            used,
            total,
            percentage: memory_percentage(used, total),
        },
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

fn memory_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

/// First sensor that looks like a CPU package or core.
fn cpu_temperature() -> Option<f32> {
    let components = Components::new_with_refreshed_list();
    components
        .iter()
        .find(|c| is_cpu_sensor(c.label()))
        .map(|c| c.temperature())
        .filter(|t| t.is_finite() && *t > 0.0)
}

fn is_cpu_sensor(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    ["cpu", "package", "core", "tctl", "tdie"]
        .iter()
        .any(|needle| label.contains(needle))
}
