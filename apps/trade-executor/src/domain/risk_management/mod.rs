//! Risk management context.

mod config;
mod decision;
mod risk_gate;

pub use config::RiskConfig;
pub use decision::{Decision, HaltReason, RejectReason};
pub use risk_gate::{RiskContext, RiskGate, exit_quantity};
