//! Domain layer: pure trading rules and state, free of I/O.
//!
//! - `shared`: identifiers, trading mode, exchange calendar, domain errors
//! - `recommendation`: the untrusted trade judgment entering the core
//! - `order_execution`: order lifecycle and idempotency keys
//! - `portfolio`: positions, daily counters, and the persisted ledger
//! - `risk_management`: risk limits and the gate that enforces them
//! - `sizing`: strategy variants and order sizing
//! - `stop_enforcement`: stop-loss / take-profit evaluation

pub mod order_execution;
pub mod portfolio;
pub mod recommendation;
pub mod risk_management;
pub mod shared;
pub mod sizing;
pub mod stop_enforcement;
