/*!
 * Causal Memory Layer Tests
 * Graph and log kept in step across restarts and persistence failures
 */

use adaptive_scheduler::core::types::value_map;
use adaptive_scheduler::{
    CausalMemoryLayer, OutcomeRecord, RuntimeConfig, StoreError, SubjectKind,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn config_at(path: PathBuf) -> RuntimeConfig {
    RuntimeConfig {
        store_path: path,
        ..Default::default()
    }
}

fn low_ram_failure(subject: &str) -> OutcomeRecord {
    OutcomeRecord::builder(subject, SubjectKind::Llm)
        .hardware(value_map([("ram_gb", 4.0)]))
        .failed("oom")
        .build()
}

#[test]
fn test_persist_failure_returns_record_for_retry() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let broken = CausalMemoryLayer::open(&config_at(dir.path().to_path_buf()));

    let err = broken
        .record(low_ram_failure("m1"))
        .expect_err("Append into a directory should fail");
    assert!(matches!(err.source, StoreError::Io { .. }));
    assert!(broken.graph().edge("ram<8gb", "failure:m1").is_some());
    assert!(broken.graph().edge("error:oom", "failure:m1").is_some());

    // The returned record can be written elsewhere unchanged
    let healthy = CausalMemoryLayer::open(&config_at(dir.path().join("memory.jsonl")));
    let id = err.record.id().to_string();
    let stored = healthy.record(*err.record).expect("Retry failed");
    assert_eq!(stored.id(), id);

    let reloaded = healthy.store().load_all().expect("Load failed");
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id(), id);
}

#[test]
fn test_reopen_replays_every_record() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = config_at(dir.path().join("memory.jsonl"));

    {
        let layer = CausalMemoryLayer::open(&config);
        for _ in 0..3 {
            layer.record(low_ram_failure("m1")).expect("Record failed");
        }
        layer
            .record(
                OutcomeRecord::builder("m1", SubjectKind::Llm)
                    .hardware(value_map([("ram_gb", 4.0)]))
                    .build(),
            )
            .expect("Record failed");
    }

    let reopened = CausalMemoryLayer::open(&config);
    let failure = reopened
        .graph()
        .edge("ram<8gb", "failure:m1")
        .expect("Failure edge missing");
    let model = reopened
        .graph()
        .edge("ram<8gb", "model:m1")
        .expect("Model edge missing");

    assert_eq!(failure.count, 3);
    assert_eq!(model.count, 4);
    assert_eq!(model.weight, 0.5);
}

#[test]
fn test_engine_sees_recorded_outcomes() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let layer = CausalMemoryLayer::open(&config_at(dir.path().join("memory.jsonl")));
    let engine = layer.engine();

    let before = engine.subject_evidence("m1");
    assert!(before.is_err(), "Unknown subject should be reported");

    layer.record(low_ram_failure("m1")).expect("Record failed");
    layer
        .record(OutcomeRecord::builder("m1", SubjectKind::Llm).build())
        .expect("Record failed");

    let evidence = engine.subject_evidence("m1").expect("Evidence missing");
    assert_eq!(evidence.observations, 2);
    assert_eq!(evidence.successes, 1);
}

#[test]
fn test_clones_share_state() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let layer = CausalMemoryLayer::open(&config_at(dir.path().join("memory.jsonl")));
    let clone = layer.clone();

    clone.record(low_ram_failure("m2")).expect("Record failed");

    assert_eq!(layer.graph().len(), clone.graph().len());
    assert_eq!(layer.store().len().expect("Load failed"), 1);
}
