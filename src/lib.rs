/*!
 * Adaptive Scheduler Library
 * Causal memory, adaptive model selection and attention scheduling for an
 * inference host
 */

pub mod causal;
pub mod core;
pub mod engine;
pub mod monitoring;
pub mod scheduler;

// Re-exports
pub use causal::{
    CausalEdge, CausalGraph, CausalMemoryLayer, EventStore, OutcomeKind, OutcomeRecord,
    OutcomeRecordBuilder, RecordQuery,
};
pub use core::limits;
pub use core::{
    AttentionMap, ConditionThresholds, EngineConfig, EngineError, MetricMap, OverloadThresholds,
    PersistError, RecordError, RuntimeConfig, SchedulerConfig, SchedulerError, StoreError,
    SubjectKind, TelemetryError, Value, ValueMap,
};
pub use engine::{
    AdaptiveEngine, CauseWeight, ContextSummary, ExecutionStrategy, ModelScore, OutcomeForecast,
    SubjectEvidence, SystemState,
};
pub use monitoring::{
    init_tracing, sample_with_timeout, HardwareSnapshot, KernelReport, KernelSignal, KernelState,
    KernelTelemetry, LoadIndex, LoadState, StaticTelemetry, SystemTelemetry, TelemetryProvider,
    TickSpan,
};
pub use scheduler::{AttentionFrame, CognitiveThread, ThreadScheduler};
