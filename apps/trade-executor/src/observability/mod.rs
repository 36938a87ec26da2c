//! Observability module for metrics and structured logging.
//!
//! This module provides instrumentation for the trade executor: a
//! `tracing` subscriber and Prometheus metrics export.

mod metrics;
mod tracing;

pub use self::metrics::{
    LATENCY_BUCKETS, MetricsError, init_metrics, record_broker_retry, record_commit_latency,
    record_exit_trigger, record_monitor_poll, record_order_outcome, record_persistence_failure,
    record_reconciliation_correction, record_risk_decision, set_open_positions,
};
pub use self::tracing::{LogFormat, TracingError, init_tracing};
