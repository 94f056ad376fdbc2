/*!
 * Thresholds and Constants
 *
 * Centralized location for every threshold, multiplier and timeout used by the
 * causal memory, the adaptive engine and the thread scheduler.
 * Organized by domain; each value is the default for an overridable field in
 * `core::config`.
 */

use std::time::Duration;

// =============================================================================
// CONDITION THRESHOLDS (causal graph labels)
// =============================================================================

/// Installed RAM below this yields `ram<8gb`
pub const LOW_RAM_GB: f64 = 8.0;

/// VRAM below this yields `vram<4gb`
pub const LOW_VRAM_GB: f64 = 4.0;

/// Generation throughput below this yields `tps<5`
pub const LOW_TOKENS_PER_SECOND: f64 = 5.0;

/// First token latency above this yields `firsttoken>1500ms`
pub const SLOW_FIRST_TOKEN_MS: f64 = 1500.0;

/// Speech real-time factor above this yields `rtf>1`
pub const SLOW_REALTIME_FACTOR: f64 = 1.0;

/// Logit margin below this yields `low_confidence_logits`
pub const LOW_LOGITS_MARGIN: f64 = 0.1;

/// Mean attention entropy above this yields `diffuse_attention`
pub const DIFFUSE_ATTENTION_ENTROPY: f64 = 5.0;

/// STT segment count above this yields `stt_segments>25`
pub const MAX_STT_SEGMENTS: f64 = 25.0;

// =============================================================================
// HARDWARE PRESSURE (admission control)
// =============================================================================

/// CPU utilisation percentage considered overloaded
pub const CPU_OVERLOAD_PERCENT: f64 = 80.0;

/// CPU package temperature (Celsius) considered overloaded
pub const CPU_OVERLOAD_TEMP_C: f64 = 75.0;

/// IO wait percentage considered overloaded
pub const IO_WAIT_OVERLOAD_PERCENT: f64 = 5.0;

/// Any swap above this (GB) counts as pressure
pub const SWAP_OVERLOAD_GB: f64 = 0.0;

/// RAM utilisation percentage considered overloaded
pub const RAM_OVERLOAD_PERCENT: f64 = 80.0;

/// Threads at or below this priority are shed under pressure
pub const LOW_PRIORITY_CUTOFF: f64 = 0.3;

/// Threads at or above this priority are throttled under pressure
pub const HIGH_PRIORITY_CUTOFF: f64 = 1.0;

/// Attention multiplier for throttled high-priority threads
pub const THROTTLE_FACTOR: f64 = 0.8;

/// Attention multiplier for mid-priority threads under pressure
pub const EXPAND_FACTOR: f64 = 1.1;

/// Lower bound for any attention weight
pub const MIN_ATTENTION_WEIGHT: f64 = 0.1;

/// Upper bound for any attention weight
pub const MAX_ATTENTION_WEIGHT: f64 = 2.0;

/// Attention decays linearly to the floor over this window (seconds)
pub const ATTENTION_DECAY_WINDOW_SECS: f64 = 300.0;

/// Decay never drops a score below this factor
pub const MIN_ATTENTION_DECAY: f64 = 0.1;

// =============================================================================
// EXTENDED PRESSURE SIGNALS
// =============================================================================

/// Priority at or below which cache thrashing pauses a thread
pub const CACHE_THRASH_PRIORITY_CUTOFF: f64 = 0.4;

/// Priority at or below which syscall floods pause a thread
pub const SYSCALL_FLOOD_PRIORITY_CUTOFF: f64 = 0.4;

/// Priority at or below which IO/context-switch storms shrink attention
pub const STORM_PRIORITY_CUTOFF: f64 = 0.5;

/// Priority at or above which a context-switch storm boosts attention
pub const STORM_BOOST_PRIORITY: f64 = 0.8;

/// Additive boost for high-priority threads during a context-switch storm
pub const STORM_BOOST: f64 = 0.5;

/// Per-CPU load (percent) marking a hotspot
pub const CPU_HOTSPOT_PERCENT: f64 = 85.0;

/// Per-CPU load (percent) marking an idle affinity set
pub const CPU_IDLE_PERCENT: f64 = 30.0;

/// Consecutive hot frames before a thread is moved off its CPUs
pub const HOTSPOT_SUSTAIN_FRAMES: u32 = 3;

/// NUMA node free/total memory ratio considered under pressure
pub const NUMA_PRESSURE_FREE_RATIO: f64 = 0.15;

/// Load index value at which the host counts as elevated
pub const LRI_ELEVATED: f64 = 0.5;

/// Load index value at which the host counts as overloaded
pub const LRI_OVERLOAD: f64 = 0.8;

/// Tag marking IO-bound threads
pub const IO_HEAVY_TAG: &str = "io-heavy";

// =============================================================================
// ADAPTIVE ENGINE
// =============================================================================

/// Multiplier turning failure edge weight into ranking penalty / risk
pub const RISK_PENALTY_MULTIPLIER: f64 = 0.2;

/// Upper bound for any penalty or risk
pub const MAX_RISK: f64 = 1.0;

/// Failure edge weight above which the engine goes conservative
pub const STRATEGY_RISK_THRESHOLD: f64 = 0.7;

/// Default number of entries returned by top-k queries
pub const DEFAULT_TOP_K: usize = 3;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Bound for a single event-log append
pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound for a telemetry sample; scheduling never waits longer
pub const DEFAULT_TELEMETRY_TIMEOUT: Duration = Duration::from_millis(250);

/// Control loop period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default event log location
pub const DEFAULT_STORE_PATH: &str = "causal_memory/memory.jsonl";
