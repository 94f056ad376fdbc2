/*!
 * Telemetry Providers
 * Injected hardware sampling for the scheduler and the adaptive engine
 *
 * Providers are created once per process and queried many times. Sampling may
 * block on procfs/sysfs reads, so async callers go through `sample_with_timeout`
 * which never fails: on error or timeout it reports an empty snapshot, i.e. no
 * pressure.
 */

use super::snapshot::{CpuTopology, HardwareSnapshot, LoadIndex, NumaNode, NumaTopology};
use crate::core::errors::{TelemetryError, TelemetryResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Components, System};
use tracing::{debug, warn};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const KB_PER_GB: f64 = 1024.0 * 1024.0;

/// Source of hardware snapshots
pub trait TelemetryProvider: Send + Sync {
    /// Take one snapshot; may block briefly
    fn snapshot(&self) -> TelemetryResult<HardwareSnapshot>;

    /// Provider name for logs
    fn name(&self) -> &str {
        "telemetry"
    }
}

/// Sample a provider on the blocking pool, bounded by `timeout`
///
/// Falls back to `HardwareSnapshot::default()` so callers never stall.
pub async fn sample_with_timeout(
    provider: Arc<dyn TelemetryProvider>,
    timeout: Duration,
) -> HardwareSnapshot {
    match try_sample(provider, timeout).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Telemetry unavailable, assuming no pressure");
            HardwareSnapshot::default()
        }
    }
}

/// Like `sample_with_timeout` but surfaces the failure
pub async fn try_sample(
    provider: Arc<dyn TelemetryProvider>,
    timeout: Duration,
) -> TelemetryResult<HardwareSnapshot> {
    let task = tokio::task::spawn_blocking(move || provider.snapshot());
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(TelemetryError::Unavailable(join.to_string())),
        Err(_) => Err(TelemetryError::Timeout(timeout)),
    }
}

/// Fixed snapshot supplied by the orchestrator
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    snapshot: RwLock<HardwareSnapshot>,
}

impl StaticTelemetry {
    pub fn new(snapshot: HardwareSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Replace the reported snapshot
    pub fn set(&self, snapshot: HardwareSnapshot) {
        *self.snapshot.write() = snapshot;
    }
}

impl TelemetryProvider for StaticTelemetry {
    fn snapshot(&self) -> TelemetryResult<HardwareSnapshot> {
        Ok(self.snapshot.read().clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Live host telemetry backed by sysinfo, procfs and sysfs
pub struct SystemTelemetry {
    system: Mutex<System>,
    last_cpu_times: Mutex<Option<CpuTimes>>,
    proc_stat: PathBuf,
    node_root: PathBuf,
}

impl SystemTelemetry {
    pub fn new() -> Self {
        Self::with_paths("/proc/stat", "/sys/devices/system/node")
    }

    /// Use alternative procfs/sysfs locations
    pub fn with_paths<P: Into<PathBuf>, Q: Into<PathBuf>>(proc_stat: P, node_root: Q) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
            last_cpu_times: Mutex::new(None),
            proc_stat: proc_stat.into(),
            node_root: node_root.into(),
        }
    }

    fn max_cpu_temp() -> Option<f64> {
        let components = Components::new_with_refreshed_list();
        components
            .list()
            .iter()
            .filter_map(|c| c.temperature())
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(f64::from)
            .reduce(f64::max)
    }

    /// IO wait percentage since the previous sample
    fn io_wait(&self) -> Option<f64> {
        let content = match fs::read_to_string(&self.proc_stat) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.proc_stat.display(), error = %e, "No procfs cpu stats");
                return None;
            }
        };
        let current = CpuTimes::parse(&content)?;
        let previous = self.last_cpu_times.lock().replace(current);
        current.io_wait_since(&previous?)
    }
}

impl Default for SystemTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryProvider for SystemTelemetry {
    fn snapshot(&self) -> TelemetryResult<HardwareSnapshot> {
        let mut snapshot = {
            let mut system = self.system.lock();
            system.refresh_cpu_usage();
            system.refresh_memory();

            let total = system.total_memory() as f64;
            if total <= 0.0 {
                return Err(TelemetryError::Unavailable(
                    "host reports no memory".to_string(),
                ));
            }

            let per_cpu: Vec<f64> = system
                .cpus()
                .iter()
                .map(|cpu| f64::from(cpu.cpu_usage()))
                .collect();

            HardwareSnapshot {
                cpu_percent: Some(f64::from(system.global_cpu_usage())),
                ram_gb: Some(total / BYTES_PER_GB),
                ram_used_gb: Some(system.used_memory() as f64 / BYTES_PER_GB),
                ram_total_gb: Some(total / BYTES_PER_GB),
                swap_used_gb: Some(system.used_swap() as f64 / BYTES_PER_GB),
                topology: Some(CpuTopology {
                    logical_cpus: Some(per_cpu.len() as u32),
                    physical_cores: None,
                    per_cpu_percent: per_cpu,
                }),
                ..Default::default()
            }
        };

        snapshot.cpu_temp = Self::max_cpu_temp();
        snapshot.io_wait = self.io_wait();
        snapshot.numa = read_numa_topology(&self.node_root);
        snapshot.lri = Some(LoadIndex::compute(&snapshot));

        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Aggregate jiffies from the first `cpu` line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    iowait: u64,
    total: u64,
}

impl CpuTimes {
    fn parse(content: &str) -> Option<Self> {
        let line = content.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|f| f.parse().ok())
            .collect();
        Some(Self {
            iowait: *fields.get(4)?,
            total: fields.iter().sum(),
        })
    }

    fn io_wait_since(&self, previous: &CpuTimes) -> Option<f64> {
        let total = self.total.checked_sub(previous.total)?;
        if total == 0 {
            return None;
        }
        let iowait = self.iowait.saturating_sub(previous.iowait);
        Some(iowait as f64 / total as f64 * 100.0)
    }
}

/// Read NUMA nodes from sysfs; `None` on hosts without NUMA info
pub fn read_numa_topology(root: &Path) -> Option<NumaTopology> {
    let entries = fs::read_dir(root).ok()?;
    let mut nodes = BTreeMap::new();

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_prefix("node"))
            .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        else {
            continue;
        };

        let path = entry.path();
        let cpus = fs::read_to_string(path.join("cpulist"))
            .map(|s| parse_cpu_list(s.trim()))
            .unwrap_or_default();
        let (mem_total_gb, mem_free_gb) = fs::read_to_string(path.join("meminfo"))
            .map(|s| parse_node_meminfo(&s))
            .unwrap_or((None, None));

        nodes.insert(
            id.to_string(),
            NumaNode {
                cpus,
                mem_total_gb,
                mem_free_gb,
            },
        );
    }

    if nodes.is_empty() {
        None
    } else {
        Some(NumaTopology { nodes })
    }
}

/// Parse a sysfs cpulist such as `0-3,8,10-11`
pub fn parse_cpu_list(list: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
                    cpus.extend(start..=end);
                }
            }
            None => {
                if let Ok(cpu) = part.parse() {
                    cpus.push(cpu);
                }
            }
        }
    }
    cpus
}

fn parse_node_meminfo(content: &str) -> (Option<f64>, Option<f64>) {
    let kb = |key: &str| {
        content
            .lines()
            .find(|line| line.contains(key))
            .and_then(|line| line.split_whitespace().find_map(|t| t.parse::<u64>().ok()))
            .map(|kb| kb as f64 / KB_PER_GB)
    };
    (kb("MemTotal:"), kb("MemFree:"))
}
