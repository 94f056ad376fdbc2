/*!
 * Pressure Rules
 * Admission control plus kernel, topology, NUMA and load-index adjustments
 *
 * Rules run in a fixed order on every frame: base admission control, kernel
 * signals, CPU topology, NUMA balance, load index.
 */

use super::ThreadScheduler;
use crate::core::limits::{
    CACHE_THRASH_PRIORITY_CUTOFF, STORM_BOOST, STORM_BOOST_PRIORITY, STORM_PRIORITY_CUTOFF,
    SYSCALL_FLOOD_PRIORITY_CUTOFF,
};
use crate::monitoring::{
    CpuTopology, HardwareSnapshot, KernelReport, KernelSignal, LoadIndex, LoadState, NumaTopology,
};
use tracing::{debug, info};

/// Attention multiplier for every thread while the cache thrashes
const CACHE_THRASH_FACTOR: f64 = 0.85;

/// Attention multiplier for low-priority threads during an IO wait spike
const IOWAIT_FACTOR: f64 = 0.8;

/// Attention multiplier for every thread during a branch mispredict storm
const BRANCH_MISPREDICT_FACTOR: f64 = 0.9;

/// Attention multiplier for low-priority threads during a context switch storm
const STORM_SHRINK_FACTOR: f64 = 0.85;

/// Attention multiplier for threads pinned to hot CPUs
const HOT_AFFINITY_FACTOR: f64 = 0.85;

/// Attention multiplier for threads pinned to idle CPUs
const IDLE_AFFINITY_FACTOR: f64 = 1.05;

/// Attention multiplier for threads on a memory-starved NUMA node
const NUMA_PRESSURE_FACTOR: f64 = 0.8;

/// Attention multiplier for low-priority threads at an elevated load index
const LRI_ELEVATED_FACTOR: f64 = 0.9;

/// Priority at or below which an elevated load index shrinks attention
const LRI_ELEVATED_PRIORITY_CUTOFF: f64 = 0.5;

impl ThreadScheduler {
    /// Base admission control; returns whether the snapshot counts as overloaded
    ///
    /// Under overload: priority <= low cutoff is paused, priority >= high cutoff is
    /// throttled, everything in between may expand.
    pub fn apply_hardware_pressure(&mut self, hardware: &HardwareSnapshot) -> bool {
        if !hardware.is_overloaded(&self.config.overload) {
            return false;
        }
        debug!(
            cpu_percent = ?hardware.cpu_percent,
            cpu_temp = ?hardware.cpu_temp,
            io_wait = ?hardware.io_wait,
            ram_percent = ?hardware.ram_percent(),
            "Hardware overload, applying admission control"
        );
        self.admission_control();
        true
    }

    fn admission_control(&mut self) {
        let config = &self.config;
        for thread in self.threads.values_mut() {
            if thread.priority() <= config.low_priority_cutoff {
                if thread.set_active(false) {
                    debug!(thread_id = thread.id(), "Low-priority thread shed");
                }
            } else if thread.priority() >= config.high_priority_cutoff {
                thread.shrink_attention(config.throttle_factor, config.min_attention);
            } else {
                thread.grow_attention(config.expand_factor, config.max_attention);
            }
        }
    }

    /// Layered rules for the nested telemetry maps
    pub(crate) fn apply_extended_pressure(
        &mut self,
        hardware: &HardwareSnapshot,
        frame_thread: &str,
        base_fired: bool,
    ) {
        if let Some(kernel) = &hardware.kernel {
            self.apply_kernel_signals(kernel);
        }
        match &hardware.topology {
            Some(topology) if !topology.per_cpu_percent.is_empty() => {
                self.apply_cpu_topology(topology, frame_thread);
            }
            _ => {
                self.hotspot_streaks.remove(frame_thread);
            }
        }
        if let Some(numa) = &hardware.numa {
            self.apply_numa_balance(numa, frame_thread);
        }
        if let Some(lri) = &hardware.lri {
            self.apply_load_index(lri, base_fired);
        }
    }

    fn apply_kernel_signals(&mut self, kernel: &KernelReport) {
        if kernel.signals.is_empty() {
            return;
        }
        let has = |signal: KernelSignal| kernel.signals.contains(&signal);
        let cache_thrashing = has(KernelSignal::CacheThrashing);
        let iowait_spike = has(KernelSignal::IowaitSpike);
        let syscall_flood = has(KernelSignal::SyscallFlood);
        let branch_storm = has(KernelSignal::BranchMispredictStorm);
        let switch_storm = has(KernelSignal::ContextSwitchStorm);

        debug!(signals = ?kernel.signals, "Applying kernel signals");

        let (floor, ceiling) = (self.config.min_attention, self.config.max_attention);
        for thread in self.threads.values_mut() {
            let priority = thread.priority();
            let mut shed = false;

            if cache_thrashing {
                thread.shrink_attention(CACHE_THRASH_FACTOR, floor);
                shed |= priority <= CACHE_THRASH_PRIORITY_CUTOFF;
            }
            if iowait_spike {
                if thread.is_io_heavy() {
                    shed = true;
                } else if priority <= STORM_PRIORITY_CUTOFF {
                    thread.shrink_attention(IOWAIT_FACTOR, floor);
                }
            }
            if syscall_flood {
                shed |= thread.is_io_heavy() || priority <= SYSCALL_FLOOD_PRIORITY_CUTOFF;
            }
            if branch_storm {
                thread.shrink_attention(BRANCH_MISPREDICT_FACTOR, floor);
            }
            if switch_storm {
                if priority >= STORM_BOOST_PRIORITY {
                    thread.boost_attention(STORM_BOOST, ceiling);
                } else if priority <= STORM_PRIORITY_CUTOFF {
                    thread.shrink_attention(STORM_SHRINK_FACTOR, floor);
                }
                shed |= thread.is_io_heavy();
            }

            if shed && thread.set_active(false) {
                debug!(thread_id = thread.id(), priority, "Thread shed on kernel signal");
            }
        }
    }

    fn apply_cpu_topology(&mut self, topology: &CpuTopology, frame_thread: &str) {
        let (hot, idle) = (self.config.cpu_hotspot_percent, self.config.cpu_idle_percent);
        let (floor, ceiling) = (self.config.min_attention, self.config.max_attention);

        for thread in self.threads.values_mut() {
            if thread.cpu_affinity().is_empty() {
                continue;
            }
            match topology.mean_load(thread.cpu_affinity()) {
                Some(load) if load >= hot => thread.shrink_attention(HOT_AFFINITY_FACTOR, floor),
                Some(load) if load <= idle => thread.grow_attention(IDLE_AFFINITY_FACTOR, ceiling),
                _ => {}
            }
        }

        self.track_hotspot(topology, frame_thread);
    }

    /// Move the frame thread off hot CPUs once the hotspot has lasted long enough
    fn track_hotspot(&mut self, topology: &CpuTopology, frame_thread: &str) {
        let hot_cpus = topology.hot_cpus(self.config.cpu_hotspot_percent);
        let Some(thread) = self.threads.get_mut(frame_thread) else {
            return;
        };

        let on_hotspot = !hot_cpus.is_empty()
            && (thread.cpu_affinity().is_empty()
                || thread.cpu_affinity().iter().any(|cpu| hot_cpus.contains(cpu)));
        if !on_hotspot {
            self.hotspot_streaks.remove(frame_thread);
            return;
        }

        let streak = self
            .hotspot_streaks
            .entry(frame_thread.to_string())
            .or_insert(0);
        *streak += 1;
        if *streak < self.config.hotspot_sustain_frames {
            return;
        }

        match topology.least_loaded_cpu() {
            Some(target) if !hot_cpus.contains(&target) => {
                info!(
                    thread_id = frame_thread,
                    from = ?thread.cpu_affinity(),
                    to = target,
                    frames = *streak,
                    "Sustained CPU hotspot, reassigning affinity"
                );
                thread.assign_affinity(vec![target]);
                self.hotspot_streaks.remove(frame_thread);
            }
            _ => debug!(thread_id = frame_thread, "Every CPU is hot, affinity kept"),
        }
    }

    fn apply_numa_balance(&mut self, numa: &NumaTopology, frame_thread: &str) {
        let ratio = self.config.numa_pressure_free_ratio;
        let floor = self.config.min_attention;

        for thread in self.threads.values_mut() {
            let pressured = thread
                .numa_node()
                .and_then(|node| numa.node(node))
                .is_some_and(|node| node.under_pressure(ratio));
            if pressured {
                thread.shrink_attention(NUMA_PRESSURE_FACTOR, floor);
            }
        }

        let Some(thread) = self.threads.get_mut(frame_thread) else {
            return;
        };
        let Some(current) = thread.numa_node() else {
            return;
        };
        if !numa.node(current).is_some_and(|node| node.under_pressure(ratio)) {
            return;
        }

        match numa.least_loaded_node() {
            Some((target, node)) if target != current && !node.under_pressure(ratio) => {
                info!(
                    thread_id = frame_thread,
                    from = current,
                    to = target,
                    "NUMA memory pressure, reassigning node"
                );
                thread.assign_numa_node(target);
                if !node.cpus.is_empty() {
                    thread.assign_affinity(node.cpus.clone());
                }
            }
            _ => debug!(thread_id = frame_thread, node = current, "No NUMA node with headroom"),
        }
    }

    fn apply_load_index(&mut self, lri: &LoadIndex, base_fired: bool) {
        match lri.state {
            LoadState::Overload if !base_fired => {
                debug!(lri = lri.value, "Load index overload, applying admission control");
                self.admission_control();
            }
            LoadState::Elevated => {
                let floor = self.config.min_attention;
                for thread in self.threads.values_mut() {
                    if thread.priority() <= LRI_ELEVATED_PRIORITY_CUTOFF {
                        thread.shrink_attention(LRI_ELEVATED_FACTOR, floor);
                    }
                }
            }
            _ => {}
        }
    }
}
