/*!
 * Causal Memory Layer
 * Event store and causal graph kept in step
 */

use super::graph::CausalGraph;
use super::record::OutcomeRecord;
use super::store::EventStore;
use crate::core::config::{EngineConfig, RuntimeConfig};
use crate::core::errors::{PersistError, StoreError};
use crate::core::types::{MetricMap, SubjectKind};
use crate::engine::AdaptiveEngine;
use crate::monitoring::HardwareSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Owns the event log and the graph folded from it
#[derive(Debug, Clone)]
pub struct CausalMemoryLayer {
    store: Arc<EventStore>,
    graph: Arc<CausalGraph>,
    engine_config: EngineConfig,
    append_timeout: Duration,
}

impl CausalMemoryLayer {
    /// Open the log at `config.store_path` and replay it into a fresh graph
    ///
    /// An unreadable log is logged and treated as empty.
    pub fn open(config: &RuntimeConfig) -> Self {
        let store = EventStore::new(&config.store_path);
        let graph = CausalGraph::with_thresholds(config.engine.conditions.clone());

        match store.load_all() {
            Ok(records) => {
                let replayed = graph.replay(&records);
                info!(
                    path = %store.path().display(),
                    records = replayed,
                    edges = graph.len(),
                    "Causal memory replayed"
                );
            }
            Err(e) => warn!(
                path = %store.path().display(),
                error = %e,
                "Event log unreadable, starting with an empty graph"
            ),
        }

        Self {
            store: Arc::new(store),
            graph: Arc::new(graph),
            engine_config: config.engine.clone(),
            append_timeout: config.append_timeout,
        }
    }

    /// Layer over existing parts, without replay
    pub fn from_parts(
        store: Arc<EventStore>,
        graph: Arc<CausalGraph>,
        engine_config: EngineConfig,
        append_timeout: Duration,
    ) -> Self {
        Self {
            store,
            graph,
            engine_config,
            append_timeout,
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn graph(&self) -> &Arc<CausalGraph> {
        &self.graph
    }

    /// Engine reading the same store and graph
    pub fn engine(&self) -> AdaptiveEngine {
        AdaptiveEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.graph),
            self.engine_config.clone(),
        )
    }

    /// Observe then append
    ///
    /// On append failure the graph already holds the observation and the record
    /// comes back inside the error.
    pub fn record(&self, record: OutcomeRecord) -> Result<OutcomeRecord, PersistError> {
        self.graph.observe(&record);
        match self.store.append(&record) {
            Ok(()) => Ok(record),
            Err(source) => Err(self.persist_failed(record, source)),
        }
    }

    /// Build and record the outcome of one task; `error` marks it failed
    pub fn record_task(
        &self,
        subject: &str,
        kind: SubjectKind,
        hardware: &HardwareSnapshot,
        metrics: MetricMap,
        error: Option<String>,
    ) -> Result<OutcomeRecord, PersistError> {
        let builder = OutcomeRecord::builder(subject, kind)
            .hardware_snapshot(hardware)
            .metrics(metrics);
        let record = match error {
            Some(error) => builder.failed(error),
            None => builder,
        }
        .build();
        self.record(record)
    }

    /// Observe then append, bounded by the configured append timeout
    pub async fn record_with_timeout(
        &self,
        record: OutcomeRecord,
    ) -> Result<OutcomeRecord, PersistError> {
        self.graph.observe(&record);
        match self
            .store
            .append_with_timeout(record.clone(), self.append_timeout)
            .await
        {
            Ok(()) => Ok(record),
            Err(source) => Err(self.persist_failed(record, source)),
        }
    }

    fn persist_failed(
        &self,
        record: OutcomeRecord,
        source: StoreError,
    ) -> PersistError {
        warn!(
            record_id = record.id(),
            path = %self.store.path().display(),
            error = %source,
            "Outcome observed but not persisted"
        );
        PersistError {
            record: Box::new(record),
            source,
        }
    }
}
