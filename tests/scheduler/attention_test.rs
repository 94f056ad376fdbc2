/*!
 * Attention Tests
 * Merit blending, normalization and active thread selection
 */

use adaptive_scheduler::{AttentionFrame, CognitiveThread, HardwareSnapshot, ThreadScheduler};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use time::{Duration, OffsetDateTime};

#[test]
fn test_merit_blends_into_attention() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(
        CognitiveThread::new("A")
            .with_priority(2.0)
            .with_attention(0.5),
    );

    let frame = AttentionFrame::new("A").merit("x", 0.8);
    let attention = scheduler.update_attention(&frame);

    let thread = scheduler.get("A").expect("Thread A missing");
    assert!((thread.attention_weight() - 0.65).abs() < 1e-12);
    assert_eq!(attention["A"], 1.0);
    assert_eq!(scheduler.select_active_thread().as_deref(), Some("A"));
}

#[test]
fn test_blend_respects_floor() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("A").with_attention(0.1));

    let frame = AttentionFrame::new("A").merit("x", -1.0);
    scheduler.update_attention(&frame);

    assert_eq!(
        scheduler.get("A").expect("Thread A missing").attention_weight(),
        0.1
    );
}

#[test]
fn test_frame_timestamp_refreshes_activity() {
    let now = OffsetDateTime::now_utc();
    let stale = now - Duration::minutes(10);
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("a").last_active_at(stale));
    scheduler.register(CognitiveThread::new("b").last_active_at(stale));

    let attention = scheduler.update_attention_at(&AttentionFrame::new("b").at(now), now);

    assert_eq!(scheduler.get("b").expect("Thread b missing").last_active(), now);
    // Stale thread sits on the decay floor: 0.1 / (0.1 + 1.0)
    assert!((attention["a"] - 0.1 / 1.1).abs() < 1e-9);
    assert!((attention["b"] - 1.0 / 1.1).abs() < 1e-9);
    assert_eq!(scheduler.select_active_thread_at(now).as_deref(), Some("b"));
}

#[test]
fn test_zero_priority_gives_zero_attention() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("a").with_priority(0.0));
    scheduler.register(CognitiveThread::new("b").with_priority(0.0));

    let attention = scheduler.update_attention(&AttentionFrame::new("a"));
    assert_eq!(attention.len(), 2);
    assert!(attention.values().all(|share| *share == 0.0));
}

#[test]
fn test_paused_threads_are_scored_but_not_selected() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("big").with_priority(2.0));
    scheduler.register(CognitiveThread::new("small").with_priority(0.5));
    scheduler.pause("big").expect("Pause failed");

    let attention = scheduler.update_attention(&AttentionFrame::new("small"));
    assert!(attention["big"] > attention["small"]);
    assert_eq!(scheduler.select_active_thread().as_deref(), Some("small"));

    scheduler.pause("small").expect("Pause failed");
    assert_eq!(scheduler.select_active_thread(), None);
}

#[test]
fn test_overload_throttles_heavy_and_expands_light() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("heavy").with_priority(1.0));
    scheduler.register(CognitiveThread::new("light").with_priority(0.8));

    let frame = AttentionFrame::new("heavy")
        .merit("focus", 0.8)
        .hardware(HardwareSnapshot {
            cpu_percent: Some(90.0),
            ram_used_gb: Some(7.0),
            ram_total_gb: Some(8.0),
            ..Default::default()
        });
    scheduler.update_attention(&frame);

    let heavy = scheduler.get("heavy").expect("Thread heavy missing");
    let light = scheduler.get("light").expect("Thread light missing");
    assert!(heavy.attention_weight() < 1.0, "heavy at {}", heavy.attention_weight());
    assert!(light.attention_weight() > 1.0, "light at {}", light.attention_weight());
}

#[test]
fn test_unknown_frame_thread_still_normalizes() {
    let mut scheduler = ThreadScheduler::new();
    scheduler.register(CognitiveThread::new("a"));

    let attention = scheduler.update_attention(&AttentionFrame::new("ghost").merit("x", 2.0));
    assert_eq!(attention.len(), 1);
    assert_eq!(attention["a"], 1.0);
    assert_eq!(scheduler.get("a").expect("Thread a missing").attention_weight(), 1.0);
}

proptest! {
    #[test]
    fn prop_attention_sums_to_one(
        threads in prop::collection::vec((0.01f64..2.0, 0.1f64..2.0, 0u32..600), 1..16)
    ) {
        let now = OffsetDateTime::now_utc();
        let mut scheduler = ThreadScheduler::new();
        for (i, (priority, attention, age)) in threads.iter().enumerate() {
            scheduler.register(
                CognitiveThread::new(format!("t{}", i))
                    .with_priority(*priority)
                    .with_attention(*attention)
                    .last_active_at(now - Duration::seconds(i64::from(*age))),
            );
        }

        let shares = scheduler.update_attention_at(&AttentionFrame::new("none").at(now), now);
        let total: f64 = shares.values().sum();
        prop_assert_eq!(shares.len(), threads.len());
        prop_assert!((total - 1.0).abs() < 1e-9, "total {}", total);
        prop_assert!(shares.values().all(|share| *share >= 0.0));
    }
}
