//! Trade history and archived days.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PositionStatus;
use crate::domain::order_execution::{IdempotencyKey, Order, OrderSide};
use crate::domain::shared::InstrumentId;

/// One confirmed fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Order the fill belongs to.
    pub key: IdempotencyKey,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Shares.
    pub quantity: u64,
    /// Fill price.
    pub price: Decimal,
    /// Realized P&L for sells.
    pub realized_pnl: Option<Decimal>,
    /// Position status after the fill.
    pub position_status: PositionStatus,
    /// Trading day of the order.
    pub trading_day: NaiveDate,
    /// Fill time.
    pub executed_at: DateTime<Utc>,
}

/// Counters and orders of a finished trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    /// Day.
    pub trading_day: NaiveDate,
    /// Buys filled that day.
    pub buy_count: u32,
    /// Realized P&L that day.
    pub realized_pnl: Decimal,
    /// Value at day start.
    pub day_start_value: Decimal,
    /// Value at rollover.
    pub closing_value: Decimal,
    /// Whether trading had been paused.
    pub paused: bool,
    /// Orders that were terminal at rollover.
    pub orders: Vec<Order>,
}
