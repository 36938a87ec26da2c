//! Prometheus metrics for the trade executor.
//!
//! Recording functions are safe to call without an installed recorder;
//! the values are simply dropped.
//!
//! # Example
//!
//! ```ignore
//! use trade_executor::observability::{init_metrics, record_risk_decision};
//!
//! init_metrics("0.0.0.0:9100".parse()?)?;
//! record_risk_decision("approved", "buy");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Histogram buckets for latency measurements (in seconds), 1ms to 10s.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
pub fn init_metrics(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    ::tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Risk and Order Metrics
// ============================================================================

/// Record a risk gate decision.
///
/// # Arguments
///
/// * `decision` - Decision label (e.g., "approved", "rejected", "halted")
/// * `side` - Order side ("buy" or "sell")
pub fn record_risk_decision(decision: &'static str, side: &str) {
    counter!(
        "risk_decisions_total",
        "decision" => decision,
        "side" => side.to_string()
    )
    .increment(1);
}

/// Record the terminal or parked status of an executed order.
pub fn record_order_outcome(side: &str, status: &str) {
    counter!(
        "order_outcomes_total",
        "side" => side.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a broker submission retry.
///
/// # Arguments
///
/// * `kind` - Broker error kind that caused the retry (e.g., "timeout")
pub fn record_broker_retry(kind: &'static str) {
    counter!("broker_retries_total", "kind" => kind).increment(1);
}

// ============================================================================
// Position Monitor Metrics
// ============================================================================

/// Record a stop-loss or take-profit trigger.
pub fn record_exit_trigger(trigger: &'static str) {
    counter!("exit_triggers_total", "trigger" => trigger).increment(1);
}

/// Update the open positions gauge.
pub fn set_open_positions(count: usize) {
    gauge!("open_positions").set(count as f64);
}

/// Record the duration of one monitor poll.
pub fn record_monitor_poll(elapsed: Duration) {
    histogram!("monitor_poll_duration_seconds").record(elapsed.as_secs_f64());
}

// ============================================================================
// State Store Metrics
// ============================================================================

/// Record the latency of a persisted commit.
pub fn record_commit_latency(elapsed: Duration) {
    histogram!("state_commit_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a failed state write.
pub fn record_persistence_failure() {
    counter!("state_persistence_failures_total").increment(1);
}

/// Record a correction applied by reconciliation.
pub fn record_reconciliation_correction(kind: &'static str) {
    counter!("reconciliation_corrections_total", "kind" => kind).increment(1);
}
