/*!
 * Adaptive Scheduler - Main Entry Point
 *
 * Host control loop that:
 * - Samples hardware telemetry every tick
 * - Logs the recommended execution strategy for the candidate models
 * - Redistributes attention across the registered threads
 */

use std::error::Error;
use std::sync::Arc;
use tracing::{info, warn};

use adaptive_scheduler::limits::DEFAULT_TOP_K;
use adaptive_scheduler::{
    init_tracing, sample_with_timeout, AttentionFrame, CausalMemoryLayer, CognitiveThread,
    RuntimeConfig, SystemTelemetry, TelemetryProvider, ThreadScheduler, TickSpan, Value,
    ValueMap,
};

/// Candidates ranked when SCHEDULER_CANDIDATES is unset
const DEFAULT_CANDIDATES: &str = "default-llm";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize structured tracing
    init_tracing();

    info!("Adaptive scheduler starting...");

    let config = RuntimeConfig::from_env();
    info!(
        store_path = %config.store_path.display(),
        tick_ms = config.tick_interval.as_millis() as u64,
        telemetry_timeout_ms = config.scheduler.telemetry_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let candidates: Vec<String> = std::env::var("SCHEDULER_CANDIDATES")
        .unwrap_or_else(|_| DEFAULT_CANDIDATES.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    info!(candidates = ?candidates, "Candidate models");

    info!("Opening causal memory...");
    let memory = CausalMemoryLayer::open(&config);

    info!("Initializing telemetry...");
    let telemetry: Arc<dyn TelemetryProvider> = Arc::new(SystemTelemetry::new());
    let engine = memory.engine();

    info!("Initializing thread scheduler...");
    let mut scheduler =
        ThreadScheduler::with_config(config.scheduler.clone()).with_telemetry(Arc::clone(&telemetry));
    scheduler.register(CognitiveThread::new("inference").with_priority(1.0));
    scheduler.register(
        CognitiveThread::new("speech")
            .with_priority(0.8)
            .with_tags(["io-heavy"]),
    );
    scheduler.register(CognitiveThread::new("embeddings").with_priority(0.5));
    scheduler.register(CognitiveThread::new("maintenance").with_priority(0.2));

    info!("Scheduler entering control loop, press Ctrl+C to exit");

    let mut interval = tokio::time::interval(config.tick_interval);
    let mut tick: u64 = 0;
    let mut focus = String::from("inference");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Ctrl+C handler failed");
                }
                break;
            }
        }

        tick += 1;
        let span = TickSpan::new(tick);
        let snapshot =
            sample_with_timeout(Arc::clone(&telemetry), config.scheduler.telemetry_timeout).await;

        let mut context = ValueMap::new();
        context.insert("hardware".to_string(), Value::Map(snapshot.to_value_map()));

        {
            let _entered = span.enter();
            let strategy = engine.recommend_strategy(&candidates, &context);
            let summary = engine.summarize_context(&candidates, &context, DEFAULT_TOP_K);
            let recommended = engine.recommend(&candidates, &context, DEFAULT_TOP_K);
            span.record_strategy(strategy.as_str());
            info!(
                tick,
                strategy = %strategy,
                predicted_state = %summary.predicted_state,
                recommended = ?recommended,
                "Engine decision"
            );
        }

        let frame = AttentionFrame::new(focus.clone()).hardware(snapshot);
        let attention = scheduler.tick(frame).await;
        let selected = scheduler.select_active_thread();
        span.record_selected(selected.as_deref());
        info!(tick, attention = ?attention, selected = ?selected, "Attention updated");

        if let Some(next) = selected {
            focus = next;
        }
    }

    info!(ticks = tick, "Adaptive scheduler shutting down");
    Ok(())
}
