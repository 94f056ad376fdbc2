/*!
 * Runtime Configuration
 *
 * Overridable groupings of the defaults in `core::limits`.
 */

use super::limits::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Thresholds turning telemetry and metrics into condition labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionThresholds {
    pub low_ram_gb: f64,
    pub low_vram_gb: f64,
    pub low_tokens_per_second: f64,
    pub slow_first_token_ms: f64,
    pub slow_realtime_factor: f64,
    pub low_logits_margin: f64,
    pub diffuse_attention_entropy: f64,
    pub max_stt_segments: f64,
    pub overload: OverloadThresholds,
}

impl Default for ConditionThresholds {
    fn default() -> Self {
        Self {
            low_ram_gb: LOW_RAM_GB,
            low_vram_gb: LOW_VRAM_GB,
            low_tokens_per_second: LOW_TOKENS_PER_SECOND,
            slow_first_token_ms: SLOW_FIRST_TOKEN_MS,
            slow_realtime_factor: SLOW_REALTIME_FACTOR,
            low_logits_margin: LOW_LOGITS_MARGIN,
            diffuse_attention_entropy: DIFFUSE_ATTENTION_ENTROPY,
            max_stt_segments: MAX_STT_SEGMENTS,
            overload: OverloadThresholds::default(),
        }
    }
}

/// Limits past which the host counts as overloaded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverloadThresholds {
    pub cpu_percent: f64,
    pub cpu_temp_c: f64,
    pub io_wait_percent: f64,
    pub swap_used_gb: f64,
    pub ram_percent: f64,
}

impl Default for OverloadThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: CPU_OVERLOAD_PERCENT,
            cpu_temp_c: CPU_OVERLOAD_TEMP_C,
            io_wait_percent: IO_WAIT_OVERLOAD_PERCENT,
            swap_used_gb: SWAP_OVERLOAD_GB,
            ram_percent: RAM_OVERLOAD_PERCENT,
        }
    }
}

/// Admission control and attention tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub overload: OverloadThresholds,
    pub low_priority_cutoff: f64,
    pub high_priority_cutoff: f64,
    pub throttle_factor: f64,
    pub expand_factor: f64,
    pub min_attention: f64,
    pub max_attention: f64,
    pub decay_window_secs: f64,
    pub min_decay: f64,
    pub cpu_hotspot_percent: f64,
    pub cpu_idle_percent: f64,
    pub hotspot_sustain_frames: u32,
    pub numa_pressure_free_ratio: f64,
    pub telemetry_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            overload: OverloadThresholds::default(),
            low_priority_cutoff: LOW_PRIORITY_CUTOFF,
            high_priority_cutoff: HIGH_PRIORITY_CUTOFF,
            throttle_factor: THROTTLE_FACTOR,
            expand_factor: EXPAND_FACTOR,
            min_attention: MIN_ATTENTION_WEIGHT,
            max_attention: MAX_ATTENTION_WEIGHT,
            decay_window_secs: ATTENTION_DECAY_WINDOW_SECS,
            min_decay: MIN_ATTENTION_DECAY,
            cpu_hotspot_percent: CPU_HOTSPOT_PERCENT,
            cpu_idle_percent: CPU_IDLE_PERCENT,
            hotspot_sustain_frames: HOTSPOT_SUSTAIN_FRAMES,
            numa_pressure_free_ratio: NUMA_PRESSURE_FREE_RATIO,
            telemetry_timeout: DEFAULT_TELEMETRY_TIMEOUT,
        }
    }
}

/// Ranking and forecasting tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub conditions: ConditionThresholds,
    pub risk_multiplier: f64,
    pub max_risk: f64,
    pub strategy_risk_threshold: f64,
    pub telemetry_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conditions: ConditionThresholds::default(),
            risk_multiplier: RISK_PENALTY_MULTIPLIER,
            max_risk: MAX_RISK,
            strategy_risk_threshold: STRATEGY_RISK_THRESHOLD,
            telemetry_timeout: DEFAULT_TELEMETRY_TIMEOUT,
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub store_path: PathBuf,
    pub append_timeout: Duration,
    pub tick_interval: Duration,
    pub engine: EngineConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            append_timeout: DEFAULT_APPEND_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            engine: EngineConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load defaults overridden by environment variables
    ///
    /// - SCHEDULER_STORE_PATH: event log path
    /// - SCHEDULER_APPEND_TIMEOUT_MS: append bound
    /// - SCHEDULER_TELEMETRY_TIMEOUT_MS: telemetry sample bound
    /// - SCHEDULER_TICK_MS: control loop period
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("SCHEDULER_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(ms) = millis(&lookup, "SCHEDULER_APPEND_TIMEOUT_MS") {
            config.append_timeout = ms;
        }
        if let Some(ms) = millis(&lookup, "SCHEDULER_TELEMETRY_TIMEOUT_MS") {
            config.engine.telemetry_timeout = ms;
            config.scheduler.telemetry_timeout = ms;
        }
        if let Some(ms) = millis(&lookup, "SCHEDULER_TICK_MS") {
            config.tick_interval = ms;
        }

        config
    }
}

fn millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring unparsable duration override");
            None
        }
    }
}
