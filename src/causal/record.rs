/*!
 * Outcome Records
 * Immutable per-task results persisted to the event log
 */

use crate::core::errors::RecordError;
use crate::core::types::{MetricMap, SubjectKind, ValueMap};
use crate::monitoring::HardwareSnapshot;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use time::OffsetDateTime;
use uuid::Uuid;

/// Outcome of one completed task
///
/// Created once, appended once, never mutated. Fields are private; build
/// through [`OutcomeRecord::builder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(rename = "record_id")]
    id: String,
    #[serde(rename = "model")]
    subject: String,
    #[serde(rename = "model_type", default)]
    subject_kind: SubjectKind,
    #[serde(default)]
    inputs: ValueMap,
    #[serde(default)]
    outputs: ValueMap,
    #[serde(default)]
    parameters: ValueMap,
    #[serde(default)]
    hardware: ValueMap,
    #[serde(default, deserialize_with = "finite_metrics")]
    metrics: MetricMap,
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    timestamp: OffsetDateTime,
}

fn default_success() -> bool {
    true
}

/// Numeric entries only; `null` (a non-finite value on write) and non-numbers are dropped
fn finite_metrics<'de, D>(deserializer: D) -> Result<MetricMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.as_f64().filter(|v| v.is_finite()).map(|v| (name, v)))
        .collect())
}

/// Success or failure side of an outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl OutcomeKind {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// `success:<subject>` / `failure:<subject>`
    #[inline]
    pub fn label(&self, subject: &str) -> String {
        format!("{}:{}", self.as_str(), subject)
    }
}

impl OutcomeRecord {
    pub fn builder(subject: impl Into<String>, kind: SubjectKind) -> OutcomeRecordBuilder {
        OutcomeRecordBuilder::new(subject.into(), kind)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn subject_kind(&self) -> SubjectKind {
        self.subject_kind
    }

    pub fn inputs(&self) -> &ValueMap {
        &self.inputs
    }

    pub fn outputs(&self) -> &ValueMap {
        &self.outputs
    }

    pub fn parameters(&self) -> &ValueMap {
        &self.parameters
    }

    pub fn hardware(&self) -> &ValueMap {
        &self.hardware
    }

    pub fn metrics(&self) -> &MetricMap {
        &self.metrics
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn outcome(&self) -> OutcomeKind {
        if self.success {
            OutcomeKind::Success
        } else {
            OutcomeKind::Failure
        }
    }

    /// Encode as one log line (no trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode one log line; `line_no` is 1-based and only used for errors
    pub fn from_line(line: &str, line_no: usize) -> Result<Self, RecordError> {
        serde_json::from_str(line).map_err(|e| RecordError::Malformed {
            line: line_no,
            reason: e.to_string(),
        })
    }
}

/// Builder for [`OutcomeRecord`]
#[derive(Debug, Clone)]
pub struct OutcomeRecordBuilder {
    record: OutcomeRecord,
}

impl OutcomeRecordBuilder {
    fn new(subject: String, kind: SubjectKind) -> Self {
        Self {
            record: OutcomeRecord {
                id: Uuid::new_v4().to_string(),
                subject,
                subject_kind: kind,
                inputs: ValueMap::new(),
                outputs: ValueMap::new(),
                parameters: ValueMap::new(),
                hardware: ValueMap::new(),
                metrics: MetricMap::new(),
                success: true,
                error: None,
                tags: BTreeSet::new(),
                timestamp: OffsetDateTime::now_utc(),
            },
        }
    }

    /// Override the generated id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.record.id = id.into();
        self
    }

    pub fn inputs(mut self, inputs: ValueMap) -> Self {
        self.record.inputs = inputs;
        self
    }

    pub fn outputs(mut self, outputs: ValueMap) -> Self {
        self.record.outputs = outputs;
        self
    }

    pub fn parameters(mut self, parameters: ValueMap) -> Self {
        self.record.parameters = parameters;
        self
    }

    pub fn hardware(mut self, hardware: ValueMap) -> Self {
        self.record.hardware = hardware;
        self
    }

    pub fn hardware_snapshot(mut self, snapshot: &HardwareSnapshot) -> Self {
        self.record.hardware = snapshot.to_value_map();
        self
    }

    /// Replace all metrics; non-finite values are dropped
    pub fn metrics(mut self, metrics: MetricMap) -> Self {
        self.record.metrics.clear();
        for (name, value) in metrics {
            self = self.metric(name, value);
        }
        self
    }

    /// Set one metric; NaN and infinities cannot be persisted and are dropped
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        if value.is_finite() {
            self.record.metrics.insert(name, value);
        } else {
            debug!(metric = %name, value, "Dropping non-finite metric");
        }
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.record.success = success;
        self
    }

    /// Mark as failed with an error message
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.record.success = false;
        self.record.error = Some(error.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.record.tags.insert(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    pub fn build(self) -> OutcomeRecord {
        self.record
    }
}
