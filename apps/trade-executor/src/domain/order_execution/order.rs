//! Order record and its lifecycle.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::IdempotencyKey;
use crate::domain::shared::{BrokerOrderId, InstrumentId};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl OrderSide {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status.
///
/// `Pending -> Submitted -> Filled`, with `Rejected` and `Failed` as the
/// other terminal states. A `Pending` order is a reservation that has not
/// been acknowledged by the broker yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Reserved locally, not yet acknowledged by the broker.
    Pending,
    /// Acknowledged by the broker, awaiting fill.
    Submitted,
    /// Filled and committed.
    Filled,
    /// Refused by the broker.
    Rejected,
    /// Gave up after exhausting retries, or never reached the broker.
    Failed,
}

impl OrderStatus {
    /// Whether no further transitions are expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Failed)
    }

    /// Whether the order is reserved or working at the broker.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Submitted)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Filled => "filled",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Execution reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Shares filled.
    pub quantity: u64,
    /// Average fill price.
    pub price: Decimal,
    /// When the fill was observed.
    pub filled_at: DateTime<Utc>,
}

/// Persisted order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Idempotency key, also the broker client order id.
    pub key: IdempotencyKey,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Requested shares.
    pub quantity: u64,
    /// Reference price at submission.
    pub requested_price: Decimal,
    /// Intent sequence the key was derived from.
    pub intent_seq: u64,
    /// Trading day the order belongs to.
    pub trading_day: NaiveDate,
    /// Current status.
    pub status: OrderStatus,
    /// Broker order id once acknowledged.
    #[serde(default)]
    pub broker_order_id: Option<BrokerOrderId>,
    /// Fill once confirmed.
    #[serde(default)]
    pub fill: Option<Fill>,
    /// Reason for rejection or failure.
    #[serde(default)]
    pub reason: Option<String>,
    /// Reservation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New pending order for an intent.
    #[must_use]
    pub fn pending(
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: u64,
        requested_price: Decimal,
        trading_day: NaiveDate,
        intent_seq: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key: IdempotencyKey::derive(&instrument_id, side, trading_day, intent_seq),
            instrument_id,
            side,
            quantity,
            requested_price,
            intent_seq,
            trading_day,
            status: OrderStatus::Pending,
            broker_order_id: None,
            fill: None,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Notional at the requested price.
    #[must_use]
    pub fn requested_amount(&self) -> Decimal {
        self.requested_price * Decimal::from(self.quantity)
    }
}

/// Outcome of an execution attempt, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Idempotency key.
    pub key: IdempotencyKey,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Requested shares.
    pub quantity: u64,
    /// Status at the time of reporting.
    pub status: OrderStatus,
    /// Broker order id, if acknowledged.
    pub broker_order_id: Option<BrokerOrderId>,
    /// Filled shares.
    pub filled_quantity: u64,
    /// Average fill price.
    pub fill_price: Option<Decimal>,
    /// Rejection or failure reason.
    pub reason: Option<String>,
}

impl From<&Order> for OrderResult {
    fn from(order: &Order) -> Self {
        Self {
            key: order.key,
            instrument_id: order.instrument_id.clone(),
            side: order.side,
            quantity: order.quantity,
            status: order.status,
            broker_order_id: order.broker_order_id.clone(),
            filled_quantity: order.fill.as_ref().map_or(0, |f| f.quantity),
            fill_price: order.fill.as_ref().map(|f| f.price),
            reason: order.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn pending_order_derives_key_from_intent() {
        let now = Utc::now();
        let day = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let id = InstrumentId::new("005930").unwrap();
        let a = Order::pending(id.clone(), OrderSide::Buy, 10, dec!(70000), day, 0, now);
        let b = Order::pending(id, OrderSide::Buy, 99, dec!(71000), day, 0, now);
        assert_eq!(a.key, b.key);
        assert_eq!(a.status, OrderStatus::Pending);
        assert_eq!(a.requested_amount(), dec!(700000));
    }

    #[test]
    fn status_classification() {
        assert!(OrderStatus::Pending.is_in_flight());
        assert!(OrderStatus::Submitted.is_in_flight());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }
}
