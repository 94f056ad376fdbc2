/*!
 * Cognitive Threads
 * Competing workloads tracked by the scheduler
 */

use crate::core::limits::IO_HEAVY_TAG;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// One registered workload
///
/// `priority`, affinity and tags belong to the caller; `attention_weight` and
/// `active` change only through the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveThread {
    id: String,
    priority: f64,
    attention_weight: f64,
    active: bool,
    #[serde(with = "time::serde::rfc3339")]
    last_active: OffsetDateTime,
    #[serde(default)]
    cpu_affinity: Vec<usize>,
    #[serde(default)]
    numa_node: Option<u32>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

impl CognitiveThread {
    /// Active thread with priority and attention 1.0, last active now
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 1.0,
            attention_weight: 1.0,
            active: true,
            last_active: OffsetDateTime::now_utc(),
            cpu_affinity: Vec::new(),
            numa_node: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_attention(mut self, attention_weight: f64) -> Self {
        self.attention_weight = attention_weight;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_affinity(mut self, cpus: Vec<usize>) -> Self {
        self.cpu_affinity = cpus;
        self
    }

    pub fn with_numa_node(mut self, node: u32) -> Self {
        self.numa_node = Some(node);
        self
    }

    pub fn last_active_at(mut self, timestamp: OffsetDateTime) -> Self {
        self.last_active = timestamp;
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn priority(&self) -> f64 {
        self.priority
    }

    #[inline]
    pub fn attention_weight(&self) -> f64 {
        self.attention_weight
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn last_active(&self) -> OffsetDateTime {
        self.last_active
    }

    pub fn cpu_affinity(&self) -> &[usize] {
        &self.cpu_affinity
    }

    pub fn numa_node(&self) -> Option<u32> {
        self.numa_node
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[inline]
    pub fn is_io_heavy(&self) -> bool {
        self.has_tag(IO_HEAVY_TAG)
    }

    pub(crate) fn touch(&mut self, timestamp: OffsetDateTime) {
        self.last_active = timestamp;
    }

    pub(crate) fn set_priority(&mut self, priority: f64) {
        self.priority = priority;
    }

    pub(crate) fn set_attention(&mut self, attention_weight: f64) {
        self.attention_weight = attention_weight;
    }

    /// Multiply attention by a factor below one, never going under `floor`
    pub(crate) fn shrink_attention(&mut self, factor: f64, floor: f64) {
        self.attention_weight = (self.attention_weight * factor).max(floor);
    }

    /// Multiply attention by a factor above one, never going over `ceiling`
    pub(crate) fn grow_attention(&mut self, factor: f64, ceiling: f64) {
        self.attention_weight = (self.attention_weight * factor).min(ceiling);
    }

    /// Add to attention, never going over `ceiling`
    pub(crate) fn boost_attention(&mut self, delta: f64, ceiling: f64) {
        self.attention_weight = (self.attention_weight + delta).min(ceiling);
    }

    /// Returns true when the flag actually changed
    pub(crate) fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }

    pub(crate) fn assign_affinity(&mut self, cpus: Vec<usize>) {
        self.cpu_affinity = cpus;
    }

    pub(crate) fn assign_numa_node(&mut self, node: u32) {
        self.numa_node = Some(node);
    }
}
