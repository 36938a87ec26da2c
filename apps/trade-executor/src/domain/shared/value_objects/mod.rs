//! Value objects shared across contexts.

mod identifiers;
mod trading_mode;

pub use identifiers::{BrokerOrderId, InstrumentId};
pub use trading_mode::TradingMode;
