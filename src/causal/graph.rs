/*!
 * Causal Graph
 * Weighted condition -> outcome edges folded from outcome records
 *
 * Strategy: each edge keeps a running mean of contributed weights plus an
 * observation count, so no per-edge history is stored
 */

use super::conditions::conditions_from_record;
use super::record::OutcomeRecord;
use crate::core::config::ConditionThresholds;
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weight contributed by a condition towards an outcome label
const OUTCOME_WEIGHT: f64 = 1.0;

/// Weight contributed by a condition towards `model:<subject>`
const SUBJECT_WEIGHT: f64 = 0.5;

/// Weight contributed by an error towards an outcome label
const ERROR_WEIGHT: f64 = 1.0;

/// Running statistics for one edge
#[derive(Debug, Clone, Copy)]
struct EdgeStats {
    weight: f64,
    count: u64,
}

impl EdgeStats {
    fn new(weight: f64) -> Self {
        Self { weight, count: 1 }
    }

    /// Fold one more observation into the mean
    fn update(&mut self, weight: f64) {
        let n = self.count as f64;
        self.weight = (self.weight * n + weight) / (n + 1.0);
        self.count += 1;
    }
}

/// Read-only view of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEdge {
    pub cause: String,
    pub effect: String,
    pub weight: f64,
    pub count: u64,
}

/// In-memory causal graph
///
/// Writers take the write lock per edge update; readers copy matching edges out.
pub struct CausalGraph {
    edges: RwLock<AHashMap<(String, String), EdgeStats>>,
    thresholds: ConditionThresholds,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::with_thresholds(ConditionThresholds::default())
    }

    pub fn with_thresholds(thresholds: ConditionThresholds) -> Self {
        Self {
            edges: RwLock::new(AHashMap::new()),
            thresholds,
        }
    }

    /// Build a graph by replaying records in order
    pub fn from_records<'a, I>(records: I, thresholds: ConditionThresholds) -> Self
    where
        I: IntoIterator<Item = &'a OutcomeRecord>,
    {
        let graph = Self::with_thresholds(thresholds);
        graph.replay(records);
        graph
    }

    pub fn thresholds(&self) -> &ConditionThresholds {
        &self.thresholds
    }

    /// Create the edge or fold `weight` into its running mean
    pub fn add_edge(&self, cause: &str, effect: &str, weight: f64) {
        let mut edges = self.edges.write();
        edges
            .entry((cause.to_string(), effect.to_string()))
            .and_modify(|stats| stats.update(weight))
            .or_insert_with(|| EdgeStats::new(weight));
    }

    /// Fold one record into the graph
    pub fn observe(&self, record: &OutcomeRecord) {
        let conditions = conditions_from_record(record, &self.thresholds);
        let outcome = record.outcome().label(record.subject());
        let subject_label = format!("model:{}", record.subject());

        for condition in &conditions {
            self.add_edge(condition, &outcome, OUTCOME_WEIGHT);
            self.add_edge(condition, &subject_label, SUBJECT_WEIGHT);
        }

        if let Some(error) = record.error() {
            self.add_edge(&format!("error:{}", error), &outcome, ERROR_WEIGHT);
        }

        debug!(
            record_id = record.id(),
            outcome = %outcome,
            conditions = conditions.len(),
            "Record observed"
        );
    }

    /// Fold many records in order; returns how many were observed
    pub fn replay<'a, I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a OutcomeRecord>,
    {
        records
            .into_iter()
            .map(|record| self.observe(record))
            .count()
    }

    /// Edges ending at `effect`, in no particular order
    pub fn upstream(&self, effect: &str) -> Vec<CausalEdge> {
        self.collect(|_, e| e == effect)
    }

    /// Edges starting at `cause`, in no particular order
    pub fn downstream(&self, cause: &str) -> Vec<CausalEdge> {
        self.collect(|c, _| c == cause)
    }

    /// Every edge, in no particular order
    pub fn edges(&self) -> Vec<CausalEdge> {
        self.collect(|_, _| true)
    }

    pub fn edge(&self, cause: &str, effect: &str) -> Option<CausalEdge> {
        let edges = self.edges.read();
        edges
            .get(&(cause.to_string(), effect.to_string()))
            .map(|stats| to_edge(cause, effect, stats))
    }

    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }

    fn collect<F>(&self, keep: F) -> Vec<CausalEdge>
    where
        F: Fn(&str, &str) -> bool,
    {
        let edges = self.edges.read();
        edges
            .iter()
            .filter(|((cause, effect), _)| keep(cause, effect))
            .map(|((cause, effect), stats)| to_edge(cause, effect, stats))
            .collect()
    }
}

impl Default for CausalGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CausalGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CausalGraph")
            .field("edges", &self.len())
            .finish()
    }
}

#[inline]
fn to_edge(cause: &str, effect: &str, stats: &EdgeStats) -> CausalEdge {
    CausalEdge {
        cause: cause.to_string(),
        effect: effect.to_string(),
        weight: stats.weight,
        count: stats.count,
    }
}
