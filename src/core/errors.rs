/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::causal::OutcomeRecord;
use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Event store failures (append/load)
#[derive(Error, Debug, Diagnostic)]
pub enum StoreError {
    #[error("Event log I/O failed at {path}: {source}")]
    #[diagnostic(
        code(store::io),
        help("Check that the log directory exists and is writable. Callers may retry once.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record {record_id}: {source}")]
    #[diagnostic(code(store::serialize))]
    Serialize {
        record_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Append timed out after {0:?}")]
    #[diagnostic(
        code(store::timeout),
        help("The disk is slow or blocked. The causal graph still holds the observation.")
    )]
    Timeout(Duration),

    #[error("Append task failed: {0}")]
    #[diagnostic(code(store::join))]
    Join(String),
}

/// A stored line that cannot be decoded; skipped during load
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RecordError {
    #[error("Malformed record on line {line}: {reason}")]
    #[diagnostic(
        code(record::malformed),
        help("The line is skipped; the rest of the log still loads.")
    )]
    Malformed { line: usize, reason: String },
}

/// Adaptive engine lookups
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum EngineError {
    #[error("No recorded outcomes for subject '{0}'")]
    #[diagnostic(
        code(engine::unknown_subject),
        help("Treated as zero evidence by ranking and forecasting.")
    )]
    UnknownSubject(String),
}

/// Telemetry collection failures
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum TelemetryError {
    #[error("Telemetry unavailable: {0}")]
    #[diagnostic(code(telemetry::unavailable))]
    Unavailable(String),

    #[error("Telemetry sample timed out after {0:?}")]
    #[diagnostic(
        code(telemetry::timeout),
        help("Scheduling continues as if no pressure were detected.")
    )]
    Timeout(Duration),

    #[error("Telemetry read failed: {0}")]
    #[diagnostic(code(telemetry::io))]
    Io(String),
}

/// Thread registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SchedulerError {
    #[error("Thread '{0}' is not registered")]
    #[diagnostic(
        code(scheduler::thread_not_found),
        help("Register the thread before pausing, resuming or removing it.")
    )]
    ThreadNotFound(String),
}

/// The observation reached the causal graph but was not persisted
#[derive(Error, Debug, Diagnostic)]
#[error("Record {} folded into the graph but not persisted: {source}", record.id())]
#[diagnostic(
    code(causal::persist_failed),
    help("In-memory state is ahead of the event log until the record is appended again.")
)]
pub struct PersistError {
    pub record: Box<OutcomeRecord>,
    #[source]
    pub source: StoreError,
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type EngineResult<T> = Result<T, EngineError>;
pub type TelemetryResult<T> = Result<T, TelemetryError>;
pub type SchedulerResult<T> = Result<T, SchedulerError>;
