/*!
 * Attention Updates
 * Merit blending, recency decay, normalization and selection
 */

use super::frame::AttentionFrame;
use super::thread::CognitiveThread;
use super::ThreadScheduler;
use crate::core::types::{seconds_between, AttentionMap};
use crate::monitoring::{sample_with_timeout, HardwareSnapshot};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

impl ThreadScheduler {
    /// Fold one frame into the registry and return normalized attention
    pub fn update_attention(&mut self, frame: &AttentionFrame) -> AttentionMap {
        self.update_attention_at(frame, OffsetDateTime::now_utc())
    }

    /// [`ThreadScheduler::update_attention`] with an explicit clock for decay
    pub fn update_attention_at(&mut self, frame: &AttentionFrame, now: OffsetDateTime) -> AttentionMap {
        let min_attention = self.config.min_attention;
        if let Some(thread) = self.threads.get_mut(&frame.thread_id) {
            thread.touch(frame.timestamp);
            if let Some(merit) = frame.mean_merit() {
                let blended = ((thread.attention_weight() + merit) / 2.0).max(min_attention);
                thread.set_attention(blended);
            }
        }

        let empty = HardwareSnapshot::default();
        let hardware = frame.hardware.as_ref().unwrap_or(&empty);
        let overloaded = self.apply_hardware_pressure(hardware);
        self.apply_extended_pressure(hardware, &frame.thread_id, overloaded);

        normalize(self.scores_at(now))
    }

    /// Sample telemetry when the frame carries none, then update attention
    ///
    /// A slow or failing provider counts as no pressure.
    pub async fn tick(&mut self, mut frame: AttentionFrame) -> AttentionMap {
        if frame.hardware.is_none() {
            if let Some(provider) = self.telemetry.as_ref().map(Arc::clone) {
                let snapshot = sample_with_timeout(provider, self.config.telemetry_timeout).await;
                frame.hardware = Some(snapshot);
            }
        }
        self.update_attention(&frame)
    }

    /// Unnormalized score per thread at `now`
    pub fn scores_at(&self, now: OffsetDateTime) -> AttentionMap {
        self.threads
            .values()
            .map(|thread| (thread.id().to_string(), self.score(thread, now)))
            .collect()
    }

    /// Active thread with the highest score, most recent activity breaking ties
    pub fn select_active_thread(&self) -> Option<String> {
        self.select_active_thread_at(OffsetDateTime::now_utc())
    }

    pub fn select_active_thread_at(&self, now: OffsetDateTime) -> Option<String> {
        let selected = self
            .threads
            .values()
            .filter(|thread| thread.is_active())
            .map(|thread| (self.score(thread, now), thread.last_active(), thread.id()))
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, _, id)| id.to_string());

        debug!(selected = ?selected, "Active thread selected");
        selected
    }

    /// max(0, priority) * max(0, attention) * decay(last_active)
    fn score(&self, thread: &CognitiveThread, now: OffsetDateTime) -> f64 {
        let base = thread.priority().max(0.0) * thread.attention_weight().max(0.0);
        base * self.decay(thread.last_active(), now)
    }

    /// Linear decay to a floor over the configured window
    fn decay(&self, last_active: OffsetDateTime, now: OffsetDateTime) -> f64 {
        let elapsed = seconds_between(last_active, now);
        (1.0 - elapsed / self.config.decay_window_secs).max(self.config.min_decay)
    }
}

/// Scale scores to sum to one; all zeros when nothing scores
fn normalize(scores: AttentionMap) -> AttentionMap {
    let total: f64 = scores.values().sum();
    if total <= 0.0 || !total.is_finite() {
        return scores.into_keys().map(|id| (id, 0.0)).collect();
    }
    scores
        .into_iter()
        .map(|(id, score)| (id, score / total))
        .collect()
}
