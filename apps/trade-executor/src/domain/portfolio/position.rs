//! Position entity.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentId;

/// Position lifecycle.
///
/// `Opening` marks a placeholder while the first buy is in flight, `Closing`
/// marks a position whose exit order is in flight. `Closed` only appears in
/// trade history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    /// First buy reserved, not yet filled.
    Opening,
    /// Held and monitored.
    Open,
    /// Exit order in flight.
    Closing,
    /// Fully exited.
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// A held (or about-to-be-held) instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Shares held.
    pub quantity: u64,
    /// First fill time.
    pub entry_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: PositionStatus,
}

impl Position {
    /// Open position from a confirmed fill.
    #[must_use]
    pub const fn open(
        instrument_id: InstrumentId,
        entry_price: Decimal,
        quantity: u64,
        entry_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument_id,
            entry_price,
            quantity,
            entry_at,
            status: PositionStatus::Open,
        }
    }

    /// Value at entry price.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.entry_price * Decimal::from(self.quantity)
    }

    /// `(current - entry) / entry`, or `None` without a usable entry price.
    #[must_use]
    pub fn unrealized_return(&self, current_price: Decimal) -> Option<Decimal> {
        if self.entry_price <= Decimal::ZERO {
            return None;
        }
        Some((current_price - self.entry_price) / self.entry_price)
    }

    /// Merge an additional buy fill into the average entry price.
    pub fn add_fill(&mut self, quantity: u64, price: Decimal) {
        let total = self.quantity + quantity;
        if total == 0 {
            return;
        }
        let cost = self.cost_basis() + price * Decimal::from(quantity);
        self.entry_price = cost / Decimal::from(total);
        self.quantity = total;
    }
}
