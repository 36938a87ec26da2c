//! Alpaca Markets Broker Adapter
//!
//! `BrokerPort` over Alpaca's REST API. Live and paper accounts use separate
//! credential sets and base URLs; the adapter never mixes them.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::AlpacaBrokerAdapter;
pub use config::{AlpacaConfig, AlpacaEnvironment};
pub use error::AlpacaError;
