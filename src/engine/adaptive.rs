/*!
 * Adaptive Engine
 * Candidate ranking, risk forecasting and strategy selection
 *
 * Every query is a pure function of the current store and graph contents plus
 * its arguments. Missing history yields neutral results: zero risk, zero
 * penalty, a stable prediction.
 */

use super::types::{
    CauseWeight, ContextSummary, ExecutionStrategy, ModelScore, OutcomeForecast, SubjectEvidence,
    SystemState,
};
use crate::causal::{conditions_from_context, CausalGraph, EventStore, OutcomeKind, OutcomeRecord};
use crate::core::config::EngineConfig;
use crate::core::errors::{EngineError, EngineResult};
use crate::core::types::{Value, ValueMap};
use crate::monitoring::{try_sample, HardwareSnapshot, KernelState, LoadState, TelemetryProvider};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const SUCCESS_PREFIX: &str = "success:";
const FAILURE_PREFIX: &str = "failure:";

/// Read-side logic over the event store and the causal graph
pub struct AdaptiveEngine {
    store: Arc<EventStore>,
    graph: Arc<CausalGraph>,
    config: EngineConfig,
    telemetry: Option<Arc<dyn TelemetryProvider>>,
}

impl AdaptiveEngine {
    pub fn new(store: Arc<EventStore>, graph: Arc<CausalGraph>, config: EngineConfig) -> Self {
        Self {
            store,
            graph,
            config,
            telemetry: None,
        }
    }

    /// Attach a provider used by [`AdaptiveEngine::live_context`]
    pub fn with_telemetry(mut self, provider: Arc<dyn TelemetryProvider>) -> Self {
        self.telemetry = Some(provider);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Condition labels implied by a context
    pub fn conditions(&self, context: &ValueMap) -> Vec<String> {
        conditions_from_context(context, &self.config.conditions)
    }

    /// Rank candidates by success rate minus condition risk
    ///
    /// Descending by score; ties keep input order.
    pub fn rank_models<S: AsRef<str>>(&self, subjects: &[S], context: &ValueMap) -> Vec<ModelScore> {
        let conditions = self.conditions(context);
        let records = self.load_records();

        let mut scores: Vec<ModelScore> = subjects
            .iter()
            .map(|subject| {
                let subject = subject.as_ref();
                let evidence = evidence_for(&records, subject).unwrap_or(SubjectEvidence::NONE);
                let success_rate = evidence.success_rate();
                let penalty = self.failure_risk(subject, &conditions);
                ModelScore {
                    subject: subject.to_string(),
                    score: (success_rate - penalty).max(0.0),
                    success_rate,
                    observations: evidence.observations,
                }
            })
            .collect();

        // sort_by is stable
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores
    }

    /// First `top_k` subjects of [`AdaptiveEngine::rank_models`]
    pub fn recommend<S: AsRef<str>>(
        &self,
        subjects: &[S],
        context: &ValueMap,
        top_k: usize,
    ) -> Vec<String> {
        self.rank_models(subjects, context)
            .into_iter()
            .take(top_k)
            .map(|score| score.subject)
            .collect()
    }

    /// Failure risk per subject under a context, in [0, max_risk]
    pub fn forecast_model_risks<S: AsRef<str>>(
        &self,
        subjects: &[S],
        context: &ValueMap,
    ) -> BTreeMap<String, f64> {
        let conditions = self.conditions(context);
        subjects
            .iter()
            .map(|subject| {
                let subject = subject.as_ref();
                (subject.to_string(), self.failure_risk(subject, &conditions))
            })
            .collect()
    }

    /// Effect labels reachable from the context, by summed weight
    ///
    /// Descending by weight, then ascending by label.
    pub fn forecast_outcomes(&self, context: &ValueMap, top_k: usize) -> Vec<OutcomeForecast> {
        let mut forecasts: Vec<OutcomeForecast> = self
            .outcome_weights(&self.conditions(context))
            .into_iter()
            .map(|(label, weight)| OutcomeForecast { label, weight })
            .collect();

        forecasts.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        forecasts.truncate(top_k);
        forecasts
    }

    /// Uncertain when reachable failure weight is positive and at least the success weight
    pub fn predict_system_state(&self, context: &ValueMap) -> SystemState {
        let weights = self.outcome_weights(&self.conditions(context));

        let sum_prefixed = |prefix: &str| -> f64 {
            weights
                .iter()
                .filter(|(label, _)| label.starts_with(prefix))
                .map(|(_, weight)| weight)
                .sum()
        };
        let success = sum_prefixed(SUCCESS_PREFIX);
        let failure = sum_prefixed(FAILURE_PREFIX);

        if failure > 0.0 && failure >= success {
            SystemState::Uncertain
        } else {
            SystemState::Stable
        }
    }

    /// Pick an execution strategy under a context
    ///
    /// Precedence: a learned `failure:*` edge above the risk threshold from any
    /// context condition, then kernel or load-index overload, then kernel high
    /// throughput, else balanced. Plain hardware overload is left to the
    /// scheduler's pressure rules. `subjects` are the candidates being
    /// dispatched; risk on any subject counts.
    pub fn recommend_strategy<S: AsRef<str>>(
        &self,
        subjects: &[S],
        context: &ValueMap,
    ) -> ExecutionStrategy {
        let conditions = self.conditions(context);
        if self.has_risky_failure(&conditions) {
            debug!(
                candidates = subjects.len(),
                conditions = conditions.len(),
                "Learned failure risk, going conservative"
            );
            return ExecutionStrategy::Conservative;
        }

        let hardware = HardwareSnapshot::from_context(context);
        if hardware.kernel_state() == Some(KernelState::Overload)
            || hardware.load_state() == Some(LoadState::Overload)
        {
            return ExecutionStrategy::UltraConservative;
        }

        if hardware.kernel_state() == Some(KernelState::HighThroughput) {
            return ExecutionStrategy::Aggressive;
        }

        ExecutionStrategy::Balanced
    }

    /// Context conditions feeding `<outcome>:<subject>`, heaviest first
    pub fn explain_model_outcome(
        &self,
        subject: &str,
        outcome: OutcomeKind,
        context: &ValueMap,
    ) -> Vec<CauseWeight> {
        let label = outcome.label(subject);
        let conditions = self.conditions(context);

        let mut causes: Vec<CauseWeight> = self
            .graph
            .upstream(&label)
            .into_iter()
            .filter(|edge| conditions.contains(&edge.cause))
            .map(|edge| CauseWeight {
                cause: edge.cause,
                weight: edge.weight,
            })
            .collect();

        causes.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.cause.cmp(&b.cause)));
        causes
    }

    /// Predicted state, top outcomes and per-subject risk in one call
    pub fn summarize_context<S: AsRef<str>>(
        &self,
        subjects: &[S],
        context: &ValueMap,
        top_k: usize,
    ) -> ContextSummary {
        ContextSummary {
            predicted_state: self.predict_system_state(context),
            top_outcomes: self.forecast_outcomes(context, top_k),
            model_risks: self.forecast_model_risks(subjects, context),
        }
    }

    /// Stored outcome counts for one subject
    pub fn subject_evidence(&self, subject: &str) -> EngineResult<SubjectEvidence> {
        evidence_for(&self.load_records(), subject)
    }

    /// Add a fresh `hardware` snapshot when the context lacks one
    ///
    /// Without a provider, or on telemetry failure, the context is returned as is.
    pub async fn live_context(&self, mut context: ValueMap) -> ValueMap {
        if context.get("hardware").and_then(Value::as_map).is_some() {
            return context;
        }
        let Some(provider) = self.telemetry.clone() else {
            return context;
        };

        match try_sample(provider, self.config.telemetry_timeout).await {
            Ok(snapshot) => {
                context.insert("hardware".to_string(), Value::Map(snapshot.to_value_map()));
            }
            Err(e) => warn!(error = %e, "Live context left without hardware"),
        }
        context
    }

    /// min(max_risk, multiplier * sum of condition -> failure:<subject> weights)
    fn failure_risk(&self, subject: &str, conditions: &[String]) -> f64 {
        let label = OutcomeKind::Failure.label(subject);
        let total: f64 = conditions
            .iter()
            .flat_map(|condition| self.graph.downstream(condition))
            .filter(|edge| edge.effect == label)
            .map(|edge| edge.weight)
            .sum();
        (self.config.risk_multiplier * total).min(self.config.max_risk)
    }

    /// Any condition edge into a candidate's failure label above the strategy threshold
    ///
    /// With no candidates every failure label counts.
    fn has_risky_failure(&self, conditions: &[String]) -> bool {
        conditions
            .iter()
            .flat_map(|condition| self.graph.downstream(condition))
            .filter(|edge| edge.effect.starts_with(FAILURE_PREFIX))
            .any(|edge| edge.weight > self.config.strategy_risk_threshold)
    }

    /// Summed downstream weight per effect label, keyed in label order
    fn outcome_weights(&self, conditions: &[String]) -> BTreeMap<String, f64> {
        let mut weights = BTreeMap::new();
        for edge in conditions.iter().flat_map(|c| self.graph.downstream(c)) {
            *weights.entry(edge.effect).or_insert(0.0) += edge.weight;
        }
        weights
    }

    /// Whole log, or nothing when it cannot be read
    fn load_records(&self) -> Vec<OutcomeRecord> {
        match self.store.load_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Event log unreadable, ranking without history");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for AdaptiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveEngine")
            .field("store", &self.store.path())
            .field("graph", &self.graph)
            .field(
                "telemetry",
                &self.telemetry.as_ref().map(|provider| provider.name()),
            )
            .finish()
    }
}

fn evidence_for(records: &[OutcomeRecord], subject: &str) -> EngineResult<SubjectEvidence> {
    let (successes, observations) = records
        .iter()
        .filter(|record| record.subject() == subject)
        .fold((0u64, 0u64), |(ok, total), record| {
            (ok + u64::from(record.success()), total + 1)
        });

    if observations == 0 {
        debug!(subject, "No stored outcomes");
        return Err(EngineError::UnknownSubject(subject.to_string()));
    }
    Ok(SubjectEvidence {
        successes,
        observations,
    })
}
