/*!
 * Attention Frames
 * Per-tick input to the scheduler
 */

use crate::monitoring::HardwareSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// One scheduling input: who ran, how well, and the host state at the time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionFrame {
    pub thread_id: String,
    #[serde(default)]
    pub merit_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareSnapshot>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl AttentionFrame {
    /// Frame for `thread_id` stamped now, without merit or hardware
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            merit_scores: BTreeMap::new(),
            hardware: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn merit(mut self, name: impl Into<String>, score: f64) -> Self {
        self.merit_scores.insert(name.into(), score);
        self
    }

    pub fn hardware(mut self, snapshot: HardwareSnapshot) -> Self {
        self.hardware = Some(snapshot);
        self
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Mean of the merit scores, if any
    pub fn mean_merit(&self) -> Option<f64> {
        if self.merit_scores.is_empty() {
            None
        } else {
            Some(self.merit_scores.values().sum::<f64>() / self.merit_scores.len() as f64)
        }
    }
}
