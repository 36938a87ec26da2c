//! Broker adapters.
//!
//! - `AlpacaBrokerAdapter`: live and paper accounts over REST
//! - `SimulatedBroker`: in-process fills for simulated mode and tests

pub mod alpaca;
mod simulated;

pub use alpaca::{AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError};
pub use simulated::{FillMode, SimulatedBroker};
