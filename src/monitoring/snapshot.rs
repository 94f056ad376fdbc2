/*!
 * Hardware Snapshot
 * Typed view of a telemetry sample with explicit optional fields
 */

use crate::core::config::OverloadThresholds;
use crate::core::types::{Value, ValueMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Point-in-time hardware telemetry; absent fields never trigger pressure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_wait: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_used_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_used_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_total_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<CpuTopology>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numa: Option<NumaTopology>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lri: Option<LoadIndex>,
}

/// Kernel sensor report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelReport {
    pub signals: Vec<KernelSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<KernelState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<KernelTelemetry>,
}

/// Kernel pressure indices, each in `[0, 1]` when reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelTelemetry {
    /// Hardware pressure index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hpi: Option<f64>,
    /// Contention load index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli: Option<f64>,
}

/// Kernel-level overload signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelSignal {
    CacheThrashing,
    SyscallFlood,
    ContextSwitchStorm,
    IowaitSpike,
    BranchMispredictStorm,
    ThermalThrottling,
    KernelOverload,
    #[serde(other)]
    Other,
}

impl KernelSignal {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CacheThrashing => "cache_thrashing",
            Self::SyscallFlood => "syscall_flood",
            Self::ContextSwitchStorm => "context_switch_storm",
            Self::IowaitSpike => "iowait_spike",
            Self::BranchMispredictStorm => "branch_mispredict_storm",
            Self::ThermalThrottling => "thermal_throttling",
            Self::KernelOverload => "kernel_overload",
            Self::Other => "other",
        }
    }
}

/// Aggregate kernel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelState {
    Stable,
    Overload,
    HighThroughput,
    #[serde(other)]
    Other,
}

/// Logical CPU layout and per-CPU load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuTopology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_cores: Option<u32>,
    pub per_cpu_percent: Vec<f64>,
}

impl CpuTopology {
    /// Index of the least loaded CPU (lowest index on ties)
    pub fn least_loaded_cpu(&self) -> Option<usize> {
        self.per_cpu_percent
            .iter()
            .enumerate()
            .filter(|(_, load)| load.is_finite())
            .fold(None, |best: Option<(usize, f64)>, (idx, &load)| match best {
                Some((_, best_load)) if best_load <= load => best,
                _ => Some((idx, load)),
            })
            .map(|(idx, _)| idx)
    }

    /// CPUs loaded above `threshold` percent
    pub fn hot_cpus(&self, threshold: f64) -> Vec<usize> {
        self.per_cpu_percent
            .iter()
            .enumerate()
            .filter(|(_, &load)| load > threshold)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Mean load across the given CPUs, ignoring unknown indices
    pub fn mean_load(&self, cpus: &[usize]) -> Option<f64> {
        let samples: Vec<f64> = cpus
            .iter()
            .filter_map(|&cpu| self.per_cpu_percent.get(cpu).copied())
            .collect();
        if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        }
    }
}

/// NUMA nodes keyed by node id as a string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumaTopology {
    pub nodes: BTreeMap<String, NumaNode>,
}

impl NumaTopology {
    /// Look up a node by numeric id
    pub fn node(&self, id: u32) -> Option<&NumaNode> {
        self.nodes.get(&id.to_string())
    }

    /// Node with the highest free-memory ratio
    pub fn least_loaded_node(&self) -> Option<(u32, &NumaNode)> {
        self.nodes
            .iter()
            .filter_map(|(id, node)| Some((id.parse::<u32>().ok()?, node, node.free_ratio()?)))
            .fold(None, |best: Option<(u32, &NumaNode, f64)>, (id, node, ratio)| {
                match best {
                    Some((_, _, best_ratio)) if best_ratio >= ratio => best,
                    _ => Some((id, node, ratio)),
                }
            })
            .map(|(id, node, _)| (id, node))
    }
}

/// One NUMA node's CPUs and memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumaNode {
    pub cpus: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_total_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_free_gb: Option<f64>,
}

impl NumaNode {
    #[inline]
    pub fn free_ratio(&self) -> Option<f64> {
        match (self.mem_free_gb, self.mem_total_gb) {
            (Some(free), Some(total)) if total > 0.0 => Some(free / total),
            _ => None,
        }
    }

    #[inline]
    pub fn under_pressure(&self, free_ratio: f64) -> bool {
        self.free_ratio().is_some_and(|ratio| ratio < free_ratio)
    }
}

/// Aggregate load index (LRI)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadIndex {
    pub value: f64,
    pub state: LoadState,
    pub tags: Vec<String>,
}

/// Coarse LRI band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Stable,
    Elevated,
    Overload,
}

impl LoadState {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Elevated => "elevated",
            Self::Overload => "overload",
        }
    }
}

impl HardwareSnapshot {
    /// RAM utilisation percentage when both used and total are known
    #[inline]
    pub fn ram_percent(&self) -> Option<f64> {
        match (self.ram_used_gb, self.ram_total_gb) {
            (Some(used), Some(total)) if total > 0.0 => Some(used / total * 100.0),
            _ => None,
        }
    }

    /// Installed RAM: `ram_gb`, else `ram_total_gb`
    #[inline]
    pub fn ram_capacity_gb(&self) -> Option<f64> {
        self.ram_gb.or(self.ram_total_gb)
    }

    /// True when any base pressure signal crosses its threshold
    pub fn is_overloaded(&self, limits: &OverloadThresholds) -> bool {
        self.cpu_percent.is_some_and(|v| v > limits.cpu_percent)
            || self.cpu_temp.is_some_and(|v| v > limits.cpu_temp_c)
            || self.io_wait.is_some_and(|v| v > limits.io_wait_percent)
            || self.swap_used_gb.is_some_and(|v| v > limits.swap_used_gb)
            || self.ram_percent().is_some_and(|v| v > limits.ram_percent)
    }

    pub fn has_kernel_signal(&self, signal: KernelSignal) -> bool {
        self.kernel
            .as_ref()
            .is_some_and(|k| k.signals.contains(&signal))
    }

    pub fn kernel_state(&self) -> Option<KernelState> {
        self.kernel.as_ref().and_then(|k| k.state)
    }

    pub fn load_state(&self) -> Option<LoadState> {
        self.lri.as_ref().map(|l| l.state)
    }

    /// Parse from an opaque map; wrong-typed fields are dropped individually
    pub fn from_value_map(map: &ValueMap) -> Self {
        let number = |key: &str| map.get(key).and_then(Value::as_f64);
        Self {
            cpu_percent: number("cpu_percent"),
            cpu_temp: number("cpu_temp"),
            io_wait: number("io_wait"),
            swap_used_gb: number("swap_used_gb"),
            ram_gb: number("ram_gb"),
            ram_used_gb: number("ram_used_gb"),
            ram_total_gb: number("ram_total_gb"),
            vram_gb: number("vram_gb"),
            kernel: nested(map, "kernel"),
            topology: nested(map, "topology"),
            numa: nested(map, "numa"),
            lri: nested(map, "lri"),
        }
    }

    /// Parse an engine context: top-level keys overlaid by a nested `hardware` map
    pub fn from_context(context: &ValueMap) -> Self {
        let mut snapshot = Self::from_value_map(context);
        if let Some(hardware) = context.get("hardware").and_then(Value::as_map) {
            snapshot.overlay(Self::from_value_map(hardware));
        }
        snapshot
    }

    /// Replace fields with those present in `other`
    pub fn overlay(&mut self, other: HardwareSnapshot) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            cpu_percent, cpu_temp, io_wait, swap_used_gb, ram_gb, ram_used_gb, ram_total_gb,
            vram_gb, kernel, topology, numa, lri
        );
    }

    /// Encode as an opaque map for persistence in an outcome record
    pub fn to_value_map(&self) -> ValueMap {
        serde_json::to_value(self)
            .and_then(serde_json::from_value)
            .unwrap_or_default()
    }
}

fn nested<T: DeserializeOwned>(map: &ValueMap, key: &str) -> Option<T> {
    let value = map.get(key)?;
    let json = serde_json::to_value(value).ok()?;
    match serde_json::from_value(json) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(key, error = %e, "Ignoring malformed nested telemetry");
            None
        }
    }
}
