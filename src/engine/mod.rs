/*!
 * Adaptive Engine
 * Ranking and strategy decisions over causal memory
 */

mod adaptive;
mod types;

pub use adaptive::AdaptiveEngine;
pub use types::{
    CauseWeight, ContextSummary, ExecutionStrategy, ModelScore, OutcomeForecast, SubjectEvidence,
    SystemState,
};
