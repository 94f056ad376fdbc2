/*!
 * Engine Types
 * Derived, never persisted results of ranking and forecasting
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ranking entry for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub subject: String,
    pub score: f64,
    pub success_rate: f64,
    pub observations: u64,
}

/// Stored outcome counts for one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEvidence {
    pub successes: u64,
    pub observations: u64,
}

impl SubjectEvidence {
    pub const NONE: Self = Self {
        successes: 0,
        observations: 0,
    };

    /// Fraction of successful observations; 0 without evidence
    #[inline]
    pub fn success_rate(&self) -> f64 {
        if self.observations == 0 {
            0.0
        } else {
            self.successes as f64 / self.observations as f64
        }
    }
}

/// Aggregated downstream weight for one effect label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeForecast {
    pub label: String,
    pub weight: f64,
}

/// Contribution of one condition to an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseWeight {
    pub cause: String,
    pub weight: f64,
}

/// Predicted health of the host under a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Stable,
    Uncertain,
}

impl SystemState {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Uncertain => "uncertain",
        }
    }
}

/// How cautiously the next task should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    UltraConservative,
    Conservative,
    Balanced,
    Aggressive,
}

impl ExecutionStrategy {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UltraConservative => "ultra_conservative",
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined view of state, likely outcomes and per-subject risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub predicted_state: SystemState,
    pub top_outcomes: Vec<OutcomeForecast>,
    pub model_risks: BTreeMap<String, f64>,
}
