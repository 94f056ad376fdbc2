/*!
 * Thread Scheduler
 * Attention distribution across cognitive threads under hardware pressure
 *
 * Owned by a single control loop; every mutation goes through `&mut self`.
 */

use crate::core::config::SchedulerConfig;
use crate::monitoring::TelemetryProvider;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

mod attention;
mod frame;
mod pressure;
mod registry;
mod thread;

pub use frame::AttentionFrame;
pub use thread::CognitiveThread;

/// Registry of cognitive threads plus the attention policy applied to them
pub struct ThreadScheduler {
    threads: BTreeMap<String, CognitiveThread>,
    config: SchedulerConfig,
    telemetry: Option<Arc<dyn TelemetryProvider>>,
    // Consecutive frames each thread spent on a hot CPU
    hotspot_streaks: AHashMap<String, u32>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            threads: BTreeMap::new(),
            config,
            telemetry: None,
            hotspot_streaks: AHashMap::new(),
        }
    }

    /// Provider sampled by [`ThreadScheduler::tick`] for frames without hardware
    pub fn with_telemetry(mut self, provider: Arc<dyn TelemetryProvider>) -> Self {
        self.telemetry = Some(provider);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("threads", &self.threads.len())
            .field(
                "telemetry",
                &self.telemetry.as_ref().map(|provider| provider.name()),
            )
            .finish()
    }
}
