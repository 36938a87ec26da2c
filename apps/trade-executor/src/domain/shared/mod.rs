//! Shared kernel used across the domain contexts.

mod calendar;
mod errors;
pub mod value_objects;

pub use calendar::TradingCalendar;
pub use errors::DomainError;
pub use value_objects::{BrokerOrderId, InstrumentId, TradingMode};
