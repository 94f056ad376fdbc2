/*!
 * Ranking and Forecasting Tests
 * Candidate scoring, outcome forecasts and predicted system state
 */

use adaptive_scheduler::core::types::value_map;
use adaptive_scheduler::{
    AdaptiveEngine, CausalMemoryLayer, OutcomeKind, OutcomeRecord, RuntimeConfig, SubjectKind,
    SystemState, Value, ValueMap,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    memory: CausalMemoryLayer,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = RuntimeConfig {
            store_path: dir.path().join("memory.jsonl"),
            ..Default::default()
        };
        let memory = CausalMemoryLayer::open(&config);
        Self { _dir: dir, memory }
    }

    fn engine(&self) -> AdaptiveEngine {
        self.memory.engine()
    }

    fn record(&self, subject: &str, hardware: ValueMap, success: bool) {
        let builder = OutcomeRecord::builder(subject, SubjectKind::Llm).hardware(hardware);
        let builder = if success { builder } else { builder.failed("oom") };
        self.memory.record(builder.build()).expect("Record failed");
    }
}

/// m1: one success and two failures on a low-RAM host; m2: two successes elsewhere
fn low_ram_history() -> Fixture {
    let fixture = Fixture::new();
    fixture.record("m1", value_map([("ram_gb", 4.0)]), true);
    fixture.record("m1", value_map([("ram_gb", 4.0)]), false);
    fixture.record("m1", value_map([("ram_gb", 4.0)]), false);
    fixture.record("m2", value_map([("ram_gb", 16.0)]), true);
    fixture.record("m2", value_map([("ram_gb", 16.0)]), true);
    fixture
}

fn low_ram() -> ValueMap {
    value_map([("ram_gb", 4.0)])
}

#[test]
fn test_low_ram_failures_demote_candidate() {
    let fixture = low_ram_history();
    let engine = fixture.engine();

    let ranked = engine.rank_models(&["m1", "m2"], &low_ram());
    assert_eq!(ranked[0].subject, "m2");
    assert_eq!(ranked[1].subject, "m1");

    let m1 = &ranked[1];
    assert_eq!(m1.observations, 3);
    assert!((m1.success_rate - 1.0 / 3.0).abs() < 1e-9);
    // 1/3 success rate minus 0.2 * failure edge weight 1.0
    assert!((m1.score - (1.0 / 3.0 - 0.2)).abs() < 1e-9, "m1 score {}", m1.score);
    assert_eq!(ranked[0].score, 1.0);

    assert_eq!(
        engine.predict_system_state(&low_ram()),
        SystemState::Uncertain,
        "Failure weight matches success weight under low RAM"
    );
    assert_eq!(
        engine.predict_system_state(&value_map([("ram_gb", 32.0)])),
        SystemState::Stable
    );
}

#[test]
fn test_unobserved_candidate_scores_zero() {
    let fixture = low_ram_history();
    let engine = fixture.engine();

    let ranked = engine.rank_models(&["ghost", "m2"], &ValueMap::new());
    assert_eq!(ranked[0].subject, "m2");
    assert_eq!(ranked[1].subject, "ghost");
    assert_eq!(ranked[1].score, 0.0);
    assert_eq!(ranked[1].observations, 0);
}

#[test]
fn test_ranking_is_deterministic() {
    let fixture = low_ram_history();
    let engine = fixture.engine();
    let subjects = ["a", "m1", "b", "m2", "c"];

    let first = engine.rank_models(&subjects, &low_ram());
    for _ in 0..5 {
        assert_eq!(engine.rank_models(&subjects, &low_ram()), first);
    }

    // Unobserved ties keep input order
    let tail: Vec<&str> = first.iter().skip(2).map(|s| s.subject.as_str()).collect();
    assert_eq!(tail, vec!["a", "b", "c"]);

    assert_eq!(
        engine.recommend(&subjects, &low_ram(), 2),
        vec!["m2".to_string(), "m1".to_string()]
    );
}

#[test]
fn test_risk_grows_with_failing_conditions() {
    let fixture = Fixture::new();
    let context = value_map([
        ("ram_gb", 4.0),
        ("vram_gb", 2.0),
        ("cpu_percent", 95.0),
        ("cpu_temp", 90.0),
        ("io_wait", 10.0),
        ("swap_used_gb", 1.0),
    ]);
    let failing_hosts = [
        value_map([("ram_gb", 4.0)]),
        value_map([("vram_gb", 2.0)]),
        value_map([("cpu_percent", 95.0)]),
        value_map([("cpu_temp", 90.0)]),
        value_map([("io_wait", 10.0)]),
        value_map([("swap_used_gb", 1.0)]),
    ];

    let mut previous = fixture.engine().forecast_model_risks(&["m1"], &context)["m1"];
    assert_eq!(previous, 0.0);

    for hardware in failing_hosts {
        fixture.record("m1", hardware, false);
        let risk = fixture.engine().forecast_model_risks(&["m1"], &context)["m1"];
        assert!(risk >= previous, "Risk dropped from {} to {}", previous, risk);
        assert!(risk <= 1.0, "Risk {} exceeds the cap", risk);
        previous = risk;
    }
    assert_eq!(previous, 1.0, "Six failing conditions saturate the risk");
}

#[test]
fn test_forecast_outcomes_ordering() {
    let fixture = low_ram_history();
    let engine = fixture.engine();

    let forecasts = engine.forecast_outcomes(&low_ram(), 10);
    let labels: Vec<&str> = forecasts.iter().map(|f| f.label.as_str()).collect();
    // Equal weights fall back to label order
    assert_eq!(labels, vec!["failure:m1", "success:m1", "model:m1"]);
    assert_eq!(forecasts[2].weight, 0.5);

    assert_eq!(engine.forecast_outcomes(&low_ram(), 1).len(), 1);
    assert!(engine.forecast_outcomes(&ValueMap::new(), 3).is_empty());
}

#[test]
fn test_summarize_context() {
    let fixture = low_ram_history();
    let engine = fixture.engine();

    let summary = engine.summarize_context(&["m1", "m2"], &low_ram(), 2);
    assert_eq!(summary.predicted_state, SystemState::Uncertain);
    assert_eq!(summary.top_outcomes.len(), 2);
    assert_eq!(summary.top_outcomes[0].label, "failure:m1");
    assert!((summary.model_risks["m1"] - 0.2).abs() < 1e-9);
    assert_eq!(summary.model_risks["m2"], 0.0);
}

#[test]
fn test_explain_outcome_lists_context_causes() {
    let fixture = Fixture::new();
    fixture.record(
        "m1",
        value_map([("ram_gb", 4.0), ("cpu_percent", 95.0)]),
        false,
    );

    let engine = fixture.engine();
    let context = value_map([("ram_gb", 4.0), ("cpu_percent", 95.0)]);
    let causes = engine.explain_model_outcome("m1", OutcomeKind::Failure, &context);
    let names: Vec<&str> = causes.iter().map(|c| c.cause.as_str()).collect();
    assert_eq!(names, vec!["cpu>80", "ram<8gb"]);

    let partial = engine.explain_model_outcome("m1", OutcomeKind::Failure, &low_ram());
    assert_eq!(partial.len(), 1);
    assert!(engine
        .explain_model_outcome("m1", OutcomeKind::Success, &context)
        .is_empty());
}

#[test]
fn test_kernel_conditions_from_context() {
    let fixture = Fixture::new();
    let engine = fixture.engine();

    let kernel = value_map([
        ("signals", Value::from(vec!["cache_thrashing", "not_a_signal"])),
        ("state", Value::from("overload")),
    ]);
    let context = value_map([(
        "hardware",
        Value::Map(value_map([("kernel", Value::Map(kernel))])),
    )]);

    let conditions = engine.conditions(&context);
    assert_eq!(
        conditions,
        vec!["kernel:cache_thrashing".to_string(), "kernel:overload".to_string()]
    );
}

#[test]
fn test_nested_metrics_in_context() {
    let fixture = Fixture::new();
    let engine = fixture.engine();

    let context = value_map([
        ("tokenspersecond", Value::from(20.0)),
        (
            "metrics",
            Value::Map(value_map([("tokenspersecond", 2.0), ("realtimefactor", 1.5)])),
        ),
    ]);
    assert_eq!(
        engine.conditions(&context),
        vec!["tps<5".to_string(), "rtf>1".to_string()]
    );
}
