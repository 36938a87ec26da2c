// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Trade Executor - Rust Core Library
//!
//! Risk enforcement and order execution for a daily equity trading bot.
//! Recommendations from an untrusted decision source pass through a risk
//! gate, are sized, and reach the broker at most once per intent.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: pure rules and state
//!   - `risk_management`: daily buy limit, loss halt, pause, concentration cap
//!   - `sizing`: confidence-weighted and scalping sizing
//!   - `order_execution`: order lifecycle, idempotency keys
//!   - `portfolio`: positions, daily counters, the persisted ledger
//!   - `stop_enforcement`: stop-loss / take-profit evaluation
//!
//! - **Application**: orchestration through ports
//!   - `ports`: `BrokerPort`, `StateBackend`, `NotifierPort`, `DecisionSourcePort`, `Clock`
//!   - `services`: state store, trading engine, coordinator, position monitor, daily routine
//!   - `use_cases`: broker reconciliation
//!
//! - **Infrastructure**: adapters
//!   - `broker`: Alpaca REST adapter and an in-process simulator
//!   - `persistence`: JSON state file, in-memory backend
//!   - `notifier`: chat webhook, log-only
//!   - `decision_source`: daily recommendation files
//!   - `http`: operator command surface

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core trading rules with no I/O.
pub mod domain;

/// Application layer - Services, use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Broker retry policy.
pub mod broker;

/// YAML configuration.
pub mod config;

/// Engine-level errors.
pub mod error;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{BrokerError, BrokerPort, NotifierPort, StateBackend};
pub use application::services::{
    OrderExecutionCoordinator, PositionMonitor, StateStore, SubmissionOutcome, TradingEngine,
};
pub use application::use_cases::ReconcileUseCase;
pub use domain::order_execution::{IdempotencyKey, Order, OrderResult, OrderSide, OrderStatus};
pub use domain::recommendation::{Action, Recommendation};
pub use domain::risk_management::{RiskConfig, RiskGate};
pub use domain::shared::{InstrumentId, TradingMode};
pub use error::{EngineError, ErrorCode};
pub use infrastructure::http::{AppState, create_router};
