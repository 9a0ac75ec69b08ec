//! Metrics collection and exposition.
//!
//! # Metrics
//! - `loop_breaker_events_total` (counter): events observed
//! - `loop_breaker_window_count` (gauge): events in the current window
//! - `loop_breaker_trips_total` (counter): ARMED → TRIPPED transitions
//! - `loop_breaker_resets_total` (counter): window resets
//! - `loop_breaker_state` (gauge): 1 = tripped, 0 = armed
//! - `loop_breaker_remediations_total` (counter): by remediator and result
//! - `loop_breaker_remediation_duration_seconds` (histogram)

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::breaker::BreakerState;

/// Install the Prometheus recorder and its scrape listener. Needs a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_event(window_count: u64) {
    metrics::counter!("loop_breaker_events_total").increment(1);
    metrics::gauge!("loop_breaker_window_count").set(window_count as f64);
}

pub fn record_trip() {
    metrics::counter!("loop_breaker_trips_total").increment(1);
}

pub fn record_window_reset() {
    metrics::counter!("loop_breaker_resets_total").increment(1);
    metrics::gauge!("loop_breaker_window_count").set(0.0);
}

pub fn set_state(state: BreakerState) {
    let value = match state {
        BreakerState::Armed => 0.0,
        BreakerState::Tripped => 1.0,
    };
    metrics::gauge!("loop_breaker_state").set(value);
}

pub fn record_remediation(remediator: &'static str, succeeded: bool, elapsed: Duration) {
    let result = if succeeded { "success" } else { "failure" };
    metrics::counter!(
        "loop_breaker_remediations_total",
        "remediator" => remediator,
        "result" => result
    )
    .increment(1);
    metrics::histogram!(
        "loop_breaker_remediation_duration_seconds",
        "remediator" => remediator
    )
    .record(elapsed.as_secs_f64());
}
