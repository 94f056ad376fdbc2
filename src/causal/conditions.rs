/*!
 * Condition Labels
 * Coarse threshold-crossing tags derived from telemetry and task metrics
 */

use super::record::OutcomeRecord;
use crate::core::config::ConditionThresholds;
use crate::core::types::{MetricMap, Value, ValueMap};
use crate::monitoring::{HardwareSnapshot, KernelSignal, KernelState, LoadState};

pub const RAM_LOW: &str = "ram<8gb";
pub const VRAM_LOW: &str = "vram<4gb";
pub const TPS_LOW: &str = "tps<5";
pub const FIRST_TOKEN_SLOW: &str = "firsttoken>1500ms";
pub const RTF_SLOW: &str = "rtf>1";
pub const LOW_CONFIDENCE_LOGITS: &str = "low_confidence_logits";
pub const DIFFUSE_ATTENTION: &str = "diffuse_attention";
pub const STT_SEGMENTS_HIGH: &str = "stt_segments>25";
pub const CPU_HIGH: &str = "cpu>80";
pub const CPU_HOT: &str = "cpu_temp>75";
pub const IO_WAIT_HIGH: &str = "io_wait>5";
pub const SWAP_USED: &str = "swap>0";
pub const RAM_HIGH: &str = "ram>80pct";
pub const KERNEL_OVERLOAD: &str = "kernel:overload";

/// Labels for a telemetry snapshot plus metric map, deduplicated, in rule order
pub fn derive_conditions(
    hardware: &HardwareSnapshot,
    metrics: &MetricMap,
    thresholds: &ConditionThresholds,
) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut push = |label: String| {
        if !labels.contains(&label) {
            labels.push(label);
        }
    };

    let below = |value: Option<f64>, limit: f64| value.is_some_and(|v| v < limit);
    let above = |value: Option<f64>, limit: f64| value.is_some_and(|v| v > limit);
    let metric = |key: &str| metrics.get(key).copied().filter(|v| v.is_finite());

    if below(hardware.ram_capacity_gb(), thresholds.low_ram_gb) {
        push(RAM_LOW.into());
    }
    if below(hardware.vram_gb, thresholds.low_vram_gb) {
        push(VRAM_LOW.into());
    }

    if below(metric("tokenspersecond"), thresholds.low_tokens_per_second) {
        push(TPS_LOW.into());
    }
    if above(metric("firsttokenlatency_ms"), thresholds.slow_first_token_ms) {
        push(FIRST_TOKEN_SLOW.into());
    }
    if above(metric("realtimefactor"), thresholds.slow_realtime_factor) {
        push(RTF_SLOW.into());
    }
    if below(metric("logits_confidence_margin"), thresholds.low_logits_margin) {
        push(LOW_CONFIDENCE_LOGITS.into());
    }
    if above(metric("avg_attention_entropy"), thresholds.diffuse_attention_entropy) {
        push(DIFFUSE_ATTENTION.into());
    }
    if above(metric("segments_count"), thresholds.max_stt_segments) {
        push(STT_SEGMENTS_HIGH.into());
    }

    let overload = &thresholds.overload;
    if above(hardware.cpu_percent, overload.cpu_percent) {
        push(CPU_HIGH.into());
    }
    if above(hardware.cpu_temp, overload.cpu_temp_c) {
        push(CPU_HOT.into());
    }
    if above(hardware.io_wait, overload.io_wait_percent) {
        push(IO_WAIT_HIGH.into());
    }
    if above(hardware.swap_used_gb, overload.swap_used_gb) {
        push(SWAP_USED.into());
    }
    if above(hardware.ram_percent(), overload.ram_percent) {
        push(RAM_HIGH.into());
    }

    if let Some(kernel) = &hardware.kernel {
        for signal in kernel.signals.iter().filter(|s| **s != KernelSignal::Other) {
            push(format!("kernel:{}", signal.as_str()));
        }
        if kernel.state == Some(KernelState::Overload) {
            push(KERNEL_OVERLOAD.into());
        }
    }

    match hardware.load_state() {
        Some(state @ (LoadState::Elevated | LoadState::Overload)) => {
            push(format!("lri:{}", state.as_str()));
        }
        _ => {}
    }

    labels
}

/// Labels for a stored outcome: its hardware map plus its metrics
pub fn conditions_from_record(record: &OutcomeRecord, thresholds: &ConditionThresholds) -> Vec<String> {
    let hardware = HardwareSnapshot::from_value_map(record.hardware());
    derive_conditions(&hardware, record.metrics(), thresholds)
}

/// Labels for an engine context
///
/// Hardware comes from top-level keys overlaid by a nested `hardware` map;
/// metrics from top-level numbers overlaid by a nested `metrics` map.
pub fn conditions_from_context(context: &ValueMap, thresholds: &ConditionThresholds) -> Vec<String> {
    let hardware = HardwareSnapshot::from_context(context);

    let mut metrics: MetricMap = context
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
        .collect();
    if let Some(nested) = context.get("metrics").and_then(Value::as_map) {
        metrics.extend(
            nested
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n))),
        );
    }

    derive_conditions(&hardware, &metrics, thresholds)
}
