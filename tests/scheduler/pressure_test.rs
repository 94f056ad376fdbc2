/*!
 * Pressure Tests
 * Admission control, kernel signals, CPU hotspots and NUMA balance
 */

use adaptive_scheduler::monitoring::{CpuTopology, NumaNode, NumaTopology};
use adaptive_scheduler::{
    AttentionFrame, CognitiveThread, HardwareSnapshot, KernelReport, KernelSignal, LoadIndex,
    LoadState, ThreadScheduler,
};
use pretty_assertions::assert_eq;

fn weight(scheduler: &ThreadScheduler, id: &str) -> f64 {
    scheduler
        .get(id)
        .unwrap_or_else(|| panic!("Thread {} missing", id))
        .attention_weight()
}

fn active(scheduler: &ThreadScheduler, id: &str) -> bool {
    scheduler
        .get(id)
        .unwrap_or_else(|| panic!("Thread {} missing", id))
        .is_active()
}

fn hot_cpu0() -> HardwareSnapshot {
    HardwareSnapshot {
        topology: Some(CpuTopology {
            per_cpu_percent: vec![95.0, 10.0, 50.0, 90.0],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn numa_node(cpus: Vec<usize>, total: f64, free: f64) -> NumaNode {
    NumaNode {
        cpus,
        mem_total_gb: Some(total),
        mem_free_gb: Some(free),
    }
}

#[test]
fn test_overload_sheds_low_priority() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("low").with_priority(0.2));
    scheduler.register(CognitiveThread::new("main").with_priority(1.0));

    let frame = AttentionFrame::new("main").hardware(HardwareSnapshot {
        cpu_percent: Some(95.0),
        ..Default::default()
    });
    scheduler.update_attention(&frame);

    assert!(!active(&scheduler, "low"));
    assert!((weight(&scheduler, "main") - 0.8).abs() < 1e-12);
    assert_eq!(scheduler.select_active_thread().as_deref(), Some("main"));

    // Pressure never resumes a thread on its own
    scheduler.update_attention(&AttentionFrame::new("main"));
    assert!(!active(&scheduler, "low"));
    scheduler.resume("low").expect("Resume failed");
    assert!(active(&scheduler, "low"));
}

#[test]
fn test_throttle_stops_at_floor() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("main").with_priority(1.5).with_attention(0.11));

    let overloaded = HardwareSnapshot {
        swap_used_gb: Some(2.0),
        ..Default::default()
    };
    for _ in 0..5 {
        scheduler.apply_hardware_pressure(&overloaded);
    }
    assert_eq!(weight(&scheduler, "main"), 0.1);
}

#[test]
fn test_kernel_signal_adjustments() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(
        CognitiveThread::new("io")
            .with_priority(0.6)
            .with_tags(["io-heavy"]),
    );
    scheduler.register(CognitiveThread::new("cpu").with_priority(0.9));
    scheduler.register(CognitiveThread::new("low").with_priority(0.3));

    let frame = AttentionFrame::new("cpu")
        .merit("focus", 0.5)
        .hardware(HardwareSnapshot {
            kernel: Some(KernelReport {
                signals: vec![
                    KernelSignal::CacheThrashing,
                    KernelSignal::IowaitSpike,
                    KernelSignal::ContextSwitchStorm,
                ],
                state: None,
                telemetry: None,
            }),
            ..Default::default()
        });
    scheduler.update_attention(&frame);

    assert!(!active(&scheduler, "io"));
    assert!(!active(&scheduler, "low"));
    assert!(active(&scheduler, "cpu"));
    // (1.0 + 0.5) / 2 * 0.85 + 0.5
    assert!(weight(&scheduler, "cpu") > 1.0);
    assert!((weight(&scheduler, "cpu") - 1.1375).abs() < 1e-9);
}

#[test]
fn test_unknown_kernel_signal_is_ignored() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("low").with_priority(0.1));

    let frame = AttentionFrame::new("low").hardware(HardwareSnapshot {
        kernel: Some(KernelReport {
            signals: vec![KernelSignal::Other],
            state: None,
            telemetry: None,
        }),
        ..Default::default()
    });
    scheduler.update_attention(&frame);

    assert!(active(&scheduler, "low"));
    assert_eq!(weight(&scheduler, "low"), 1.0);
}

#[test]
fn test_sustained_hotspot_moves_frame_thread() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("t").with_affinity(vec![0]));

    let frame = || AttentionFrame::new("t").hardware(hot_cpu0());

    scheduler.update_attention(&frame());
    scheduler.update_attention(&frame());
    assert_eq!(scheduler.get("t").map(|t| t.cpu_affinity().to_vec()), Some(vec![0]));
    // Pinned to a hot CPU: 0.85 per frame
    assert!((weight(&scheduler, "t") - 0.85 * 0.85).abs() < 1e-9);

    scheduler.update_attention(&frame());
    assert_eq!(
        scheduler.get("t").map(|t| t.cpu_affinity().to_vec()),
        Some(vec![1]),
        "Third hot frame moves the thread to the least loaded CPU"
    );

    // Now pinned to an idle CPU: 1.05 per frame
    let before = weight(&scheduler, "t");
    scheduler.update_attention(&frame());
    assert!((weight(&scheduler, "t") - before * 1.05).abs() < 1e-9);
    assert_eq!(scheduler.get("t").map(|t| t.cpu_affinity().to_vec()), Some(vec![1]));
}

#[test]
fn test_hotspot_streak_resets_without_topology() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("t").with_affinity(vec![0]));

    let hot = AttentionFrame::new("t").hardware(hot_cpu0());
    scheduler.update_attention(&hot);
    scheduler.update_attention(&hot);
    scheduler.update_attention(&AttentionFrame::new("t"));
    scheduler.update_attention(&hot);
    scheduler.update_attention(&hot);

    assert_eq!(scheduler.get("t").map(|t| t.cpu_affinity().to_vec()), Some(vec![0]));

    scheduler.update_attention(&hot);
    assert_eq!(scheduler.get("t").map(|t| t.cpu_affinity().to_vec()), Some(vec![1]));
}

#[test]
fn test_hotspot_kept_when_every_cpu_is_hot() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("t").with_affinity(vec![0]));

    let frame = AttentionFrame::new("t").hardware(HardwareSnapshot {
        topology: Some(CpuTopology {
            per_cpu_percent: vec![99.0, 90.0],
            ..Default::default()
        }),
        ..Default::default()
    });
    for _ in 0..5 {
        scheduler.update_attention(&frame);
    }

    assert_eq!(scheduler.get("t").map(|t| t.cpu_affinity().to_vec()), Some(vec![0]));
}

#[test]
fn test_numa_pressure_moves_frame_thread() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("t").with_numa_node(0));
    scheduler.register(CognitiveThread::new("u").with_numa_node(0));
    scheduler.register(CognitiveThread::new("v").with_numa_node(2));

    let numa = NumaTopology {
        nodes: [
            ("0".to_string(), numa_node(vec![0, 1], 16.0, 1.0)),
            ("1".to_string(), numa_node(vec![2, 3], 16.0, 8.0)),
            ("2".to_string(), numa_node(vec![4, 5], 16.0, 4.0)),
        ]
        .into_iter()
        .collect(),
    };
    let frame = AttentionFrame::new("t").hardware(HardwareSnapshot {
        numa: Some(numa),
        ..Default::default()
    });
    scheduler.update_attention(&frame);

    let t = scheduler.get("t").expect("Thread t missing");
    assert_eq!(t.numa_node(), Some(1));
    assert_eq!(t.cpu_affinity().to_vec(), vec![2, 3]);
    assert!((t.attention_weight() - 0.8).abs() < 1e-12);

    let u = scheduler.get("u").expect("Thread u missing");
    assert_eq!(u.numa_node(), Some(0), "Only the frame thread moves");
    assert!((u.attention_weight() - 0.8).abs() < 1e-12);

    assert_eq!(weight(&scheduler, "v"), 1.0);
}

#[test]
fn test_numa_without_headroom_keeps_node() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("t").with_numa_node(0));

    let numa = NumaTopology {
        nodes: [
            ("0".to_string(), numa_node(vec![0], 16.0, 1.0)),
            ("1".to_string(), numa_node(vec![1], 16.0, 0.5)),
        ]
        .into_iter()
        .collect(),
    };
    let frame = AttentionFrame::new("t").hardware(HardwareSnapshot {
        numa: Some(numa),
        ..Default::default()
    });
    scheduler.update_attention(&frame);

    assert_eq!(scheduler.get("t").and_then(|t| t.numa_node()), Some(0));
}

#[test]
fn test_load_index_states() {
    let lri = |state: LoadState| HardwareSnapshot {
        lri: Some(LoadIndex {
            value: 0.0,
            state,
            tags: Vec::new(),
        }),
        ..Default::default()
    };

    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("low").with_priority(0.2));
    scheduler.register(CognitiveThread::new("mid").with_priority(0.5));
    scheduler.register(CognitiveThread::new("high").with_priority(1.0));

    scheduler.update_attention(&AttentionFrame::new("high").hardware(lri(LoadState::Elevated)));
    assert!((weight(&scheduler, "low") - 0.9).abs() < 1e-12);
    assert!((weight(&scheduler, "mid") - 0.9).abs() < 1e-12);
    assert_eq!(weight(&scheduler, "high"), 1.0);
    assert!(active(&scheduler, "low"));

    scheduler.update_attention(&AttentionFrame::new("high").hardware(lri(LoadState::Overload)));
    assert!(!active(&scheduler, "low"));
    assert!((weight(&scheduler, "mid") - 0.99).abs() < 1e-12);
    assert!((weight(&scheduler, "high") - 0.8).abs() < 1e-12);

    scheduler.update_attention(&AttentionFrame::new("high").hardware(lri(LoadState::Stable)));
    assert!((weight(&scheduler, "high") - 0.8).abs() < 1e-12);
}

#[test]
fn test_load_index_overload_not_applied_twice() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("high").with_priority(1.0));

    let frame = AttentionFrame::new("high").hardware(HardwareSnapshot {
        cpu_percent: Some(95.0),
        lri: Some(LoadIndex {
            value: 0.9,
            state: LoadState::Overload,
            tags: vec!["cpu_bound".to_string()],
        }),
        ..Default::default()
    });
    scheduler.update_attention(&frame);

    assert!((weight(&scheduler, "high") - 0.8).abs() < 1e-12);
}
