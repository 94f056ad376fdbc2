/*!
 * Structured Tracing
 * Subscriber setup and spans for scheduling ticks
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Ticks slower than this are reported at warn level
const SLOW_TICK_MS: u128 = 50;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SCHEDULER_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SCHEDULER_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: a host process may already own the global subscriber
    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    match result {
        Ok(()) => info!(json = use_json, "Structured tracing initialized"),
        Err(e) => debug!(error = %e, "Tracing subscriber already installed"),
    }
}

/// Span covering one scheduling tick
pub struct TickSpan {
    span: tracing::Span,
    start: Instant,
    tick: u64,
}

impl TickSpan {
    pub fn new(tick: u64) -> Self {
        let span = span!(
            Level::DEBUG,
            "tick",
            tick,
            selected = tracing::field::Empty,
            strategy = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            tick,
        }
    }

    /// Record the thread chosen this tick
    pub fn record_selected(&self, thread_id: Option<&str>) {
        self.span.record("selected", thread_id.unwrap_or("none"));
    }

    /// Record the strategy recommended this tick
    pub fn record_strategy(&self, strategy: &str) {
        self.span.record("strategy", strategy);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for TickSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed.as_millis() > SLOW_TICK_MS {
            warn!(
                tick = self.tick,
                duration_ms = elapsed.as_millis() as u64,
                "slow scheduling tick"
            );
        } else {
            debug!(
                tick = self.tick,
                duration_us = elapsed.as_micros() as u64,
                "tick completed"
            );
        }
    }
}
