//! Deterministic idempotency keys.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderSide;
use crate::domain::shared::InstrumentId;

/// Namespace for v5 key derivation. Changing it invalidates every stored key.
const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d8e_4b7a_4e59_9c31_0a5d_e2f4_b816);

/// Identifier that collapses logically identical submissions into one order.
///
/// Derived from instrument, side, trading day and intent sequence only, never
/// from price or quantity, so a retry of the same intent maps to the same key.
/// It doubles as the brokerage client order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Derive the key for one intent.
    #[must_use]
    pub fn derive(
        instrument_id: &InstrumentId,
        side: OrderSide,
        trading_day: NaiveDate,
        intent_seq: u64,
    ) -> Self {
        let name = format!(
            "{}|{}|{}|{}",
            instrument_id.as_str(),
            side.as_str(),
            trading_day.format("%Y-%m-%d"),
            intent_seq
        );
        Self(Uuid::new_v5(&KEY_NAMESPACE, name.as_bytes()))
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl std::str::FromStr for IdempotencyKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn same_intent_same_key() {
        let id = InstrumentId::new("005930").unwrap();
        assert_eq!(
            IdempotencyKey::derive(&id, OrderSide::Buy, day(3), 0),
            IdempotencyKey::derive(&id, OrderSide::Buy, day(3), 0)
        );
    }

    #[test]
    fn any_component_changes_key() {
        let id = InstrumentId::new("005930").unwrap();
        let other = InstrumentId::new("000660").unwrap();
        let base = IdempotencyKey::derive(&id, OrderSide::Buy, day(3), 0);
        assert_ne!(base, IdempotencyKey::derive(&other, OrderSide::Buy, day(3), 0));
        assert_ne!(base, IdempotencyKey::derive(&id, OrderSide::Sell, day(3), 0));
        assert_ne!(base, IdempotencyKey::derive(&id, OrderSide::Buy, day(4), 0));
        assert_ne!(base, IdempotencyKey::derive(&id, OrderSide::Buy, day(3), 1));
    }

    #[test]
    fn round_trips_through_display() {
        let id = InstrumentId::new("AAPL").unwrap();
        let key = IdempotencyKey::derive(&id, OrderSide::Sell, day(5), 2);
        let parsed: IdempotencyKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }
}
