//! Per-trading-day counters.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderSide;
use crate::domain::shared::InstrumentId;

/// Counters that reset once per trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyState {
    /// Exchange-local calendar date these counters belong to.
    pub trading_day: NaiveDate,
    /// Buy orders filled today.
    pub buy_count: u32,
    /// Realized P&L from sells today.
    pub realized_pnl: Decimal,
    /// Operator pause for the rest of the day.
    pub paused: bool,
    /// Portfolio value (cash plus cost basis) when the day started.
    pub day_start_value: Decimal,
    /// Next free intent sequence per `instrument|side`.
    #[serde(default)]
    pub intent_seqs: BTreeMap<String, u64>,
}

impl DailyState {
    /// Fresh counters for `trading_day`.
    #[must_use]
    pub const fn new(trading_day: NaiveDate, day_start_value: Decimal) -> Self {
        Self {
            trading_day,
            buy_count: 0,
            realized_pnl: Decimal::ZERO,
            paused: false,
            day_start_value,
            intent_seqs: BTreeMap::new(),
        }
    }

    /// Loss floor: `-max_daily_loss_rate * day_start_value`.
    #[must_use]
    pub fn loss_floor(&self, max_daily_loss_rate: Decimal) -> Decimal {
        -(max_daily_loss_rate * self.day_start_value)
    }

    /// Whether realized P&L is at or below the loss floor.
    #[must_use]
    pub fn loss_limit_breached(&self, max_daily_loss_rate: Decimal) -> bool {
        self.realized_pnl <= self.loss_floor(max_daily_loss_rate)
    }

    pub(crate) fn seq_slot(instrument_id: &InstrumentId, side: OrderSide) -> String {
        format!("{}|{}", instrument_id.as_str(), side.as_str())
    }

    pub(crate) fn next_seq_hint(&self, instrument_id: &InstrumentId, side: OrderSide) -> u64 {
        self.intent_seqs
            .get(&Self::seq_slot(instrument_id, side))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn loss_limit_is_inclusive() {
        let mut daily =
            DailyState::new(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(), dec!(10000000));
        daily.realized_pnl = dec!(-299999);
        assert!(!daily.loss_limit_breached(dec!(0.03)));
        daily.realized_pnl = dec!(-300000);
        assert!(daily.loss_limit_breached(dec!(0.03)));
    }
}
