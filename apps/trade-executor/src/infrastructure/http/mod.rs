//! HTTP command surface.
//!
//! Operator endpoints that delegate to the trading engine.

mod controller;
mod response;

pub use controller::{AppState, create_router};
pub use response::*;
