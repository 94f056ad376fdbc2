/*!
 * Causal Graph Tests
 * Running-mean edges, observation labels and concurrent access
 */

use adaptive_scheduler::core::types::value_map;
use adaptive_scheduler::{CausalGraph, OutcomeRecord, SubjectKind, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

proptest! {
    #[test]
    fn prop_edge_weight_is_mean(weights in prop::collection::vec(-10.0f64..10.0, 1..64)) {
        let graph = CausalGraph::new();
        for w in &weights {
            graph.add_edge("cause", "effect", *w);
        }

        let edge = graph.edge("cause", "effect").expect("Edge missing");
        let mean = weights.iter().sum::<f64>() / weights.len() as f64;
        prop_assert_eq!(edge.count, weights.len() as u64);
        prop_assert!((edge.weight - mean).abs() < 1e-9, "weight {} != mean {}", edge.weight, mean);
    }
}

#[test]
fn test_kernel_signals_become_causes() {
    let graph = CausalGraph::new();
    let kernel = value_map([
        ("signals", Value::from(vec!["cache_thrashing"])),
        ("state", Value::from("overload")),
    ]);
    let record = OutcomeRecord::builder("model-a", SubjectKind::Llm)
        .hardware(value_map([("kernel", Value::Map(kernel))]))
        .success(false)
        .build();
    graph.observe(&record);

    let downstream = graph.downstream("kernel:cache_thrashing");
    assert!(downstream.iter().any(|e| e.effect == "failure:model-a"));
    assert!(graph.edge("kernel:overload", "failure:model-a").is_some());
}

#[test]
fn test_mixed_outcomes_share_condition() {
    let graph = CausalGraph::new();
    for success in [true, false, false] {
        let record = OutcomeRecord::builder("m1", SubjectKind::Llm)
            .hardware(value_map([("ram_gb", 4.0)]))
            .success(success)
            .build();
        graph.observe(&record);
    }

    let success = graph.edge("ram<8gb", "success:m1").expect("Success edge missing");
    let failure = graph.edge("ram<8gb", "failure:m1").expect("Failure edge missing");
    let model = graph.edge("ram<8gb", "model:m1").expect("Model edge missing");

    assert_eq!((success.count, success.weight), (1, 1.0));
    assert_eq!((failure.count, failure.weight), (2, 1.0));
    assert_eq!((model.count, model.weight), (3, 0.5));
    assert_eq!(graph.upstream("failure:m1").len(), 1);
}

#[test]
fn test_readers_during_writes() {
    let graph = Arc::new(CausalGraph::new());

    let writer = {
        let graph = Arc::clone(&graph);
        thread::spawn(move || {
            for i in 0..500 {
                graph.add_edge("c", &format!("e{}", i % 10), 1.0);
            }
        })
    };
    let reader = {
        let graph = Arc::clone(&graph);
        thread::spawn(move || {
            for _ in 0..500 {
                for edge in graph.downstream("c") {
                    assert_eq!(edge.weight, 1.0);
                }
            }
        })
    };

    writer.join().expect("Writer panicked");
    reader.join().expect("Reader panicked");

    let edges = graph.downstream("c");
    assert_eq!(edges.len(), 10);
    assert!(edges.iter().all(|e| e.count == 50));
}
