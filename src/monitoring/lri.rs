/*!
 * Load Index (LRI)
 * Folds a hardware snapshot into one aggregate pressure value
 */

use super::snapshot::{HardwareSnapshot, KernelSignal, LoadIndex, LoadState};
use crate::core::limits::{
    CPU_HOTSPOT_PERCENT, CPU_OVERLOAD_PERCENT, IO_WAIT_OVERLOAD_PERCENT,
    LRI_ELEVATED, LRI_OVERLOAD, NUMA_PRESSURE_FREE_RATIO, RAM_OVERLOAD_PERCENT,
};

const IO_WAIT_SATURATION: f64 = 20.0;
const TEMP_FLOOR_C: f64 = 40.0;
const TEMP_SPAN_C: f64 = 50.0;
const THERMAL_RISK_C: f64 = 80.0;
const NUMA_PRESSURE_COMPONENT: f64 = 0.8;
const HOTSPOT_COMPONENT: f64 = 0.9;

impl LoadIndex {
    /// Compute the index as the mean of every available component
    pub fn compute(snapshot: &HardwareSnapshot) -> Self {
        let mut components: Vec<f64> = Vec::with_capacity(8);
        let mut tags: Vec<&'static str> = Vec::new();

        if let Some(cpu) = snapshot.cpu_percent {
            components.push((cpu / 100.0).min(1.0));
            if cpu > CPU_OVERLOAD_PERCENT {
                tags.push("cpu_bound");
            }
        }

        if let Some(ram_pct) = snapshot.ram_percent() {
            components.push((ram_pct / 100.0).min(1.0));
            if ram_pct > RAM_OVERLOAD_PERCENT {
                tags.push("memory_pressure");
            }
        }

        if let Some(io_wait) = snapshot.io_wait {
            components.push((io_wait / IO_WAIT_SATURATION).min(1.0));
            if io_wait > IO_WAIT_OVERLOAD_PERCENT {
                tags.push("io_bound");
            }
        }

        if let Some(temp) = snapshot.cpu_temp {
            components.push(((temp - TEMP_FLOOR_C) / TEMP_SPAN_C).clamp(0.0, 1.0));
            if temp > THERMAL_RISK_C {
                tags.push("thermal_risk");
            }
        }

        if let Some(kernel) = &snapshot.kernel {
            if let Some(telemetry) = &kernel.telemetry {
                for index in [telemetry.hpi, telemetry.cli].into_iter().flatten() {
                    if index.is_finite() {
                        components.push(index.clamp(0.0, 1.0));
                    }
                }
            }

            for signal in &kernel.signals {
                match signal {
                    KernelSignal::KernelOverload => {
                        components.push(1.0);
                        tags.push("kernel_overload");
                    }
                    KernelSignal::CacheThrashing
                    | KernelSignal::ContextSwitchStorm
                    | KernelSignal::IowaitSpike => tags.push(signal.as_str()),
                    _ => {}
                }
            }
        }

        if let Some(numa) = &snapshot.numa {
            if numa
                .nodes
                .values()
                .any(|node| node.under_pressure(NUMA_PRESSURE_FREE_RATIO))
            {
                components.push(NUMA_PRESSURE_COMPONENT);
                tags.push("numa_pressure");
            }
        }

        if let Some(topology) = &snapshot.topology {
            let max_cpu = topology
                .per_cpu_percent
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            if max_cpu > CPU_HOTSPOT_PERCENT {
                components.push(HOTSPOT_COMPONENT);
                tags.push("cpu_hotspot");
            }
        }

        let value = if components.is_empty() {
            0.0
        } else {
            components.iter().sum::<f64>() / components.len() as f64
        };

        let state = if value >= LRI_OVERLOAD {
            LoadState::Overload
        } else if value >= LRI_ELEVATED {
            LoadState::Elevated
        } else {
            LoadState::Stable
        };

        tags.sort_unstable();
        tags.dedup();

        Self {
            value,
            state,
            tags: tags.into_iter().map(String::from).collect(),
        }
    }
}
