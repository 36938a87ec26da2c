//! Stop-loss and take-profit evaluation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::Position;
use crate::domain::risk_management::RiskConfig;

/// Threshold crossed by a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitTrigger {
    /// Return at or below the stop-loss rate.
    StopLoss {
        /// Unrealized return when triggered.
        return_rate: Decimal,
    },
    /// Return at or above the take-profit rate.
    TakeProfit {
        /// Unrealized return when triggered.
        return_rate: Decimal,
    },
}

impl ExitTrigger {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::StopLoss { .. } => "stop_loss",
            Self::TakeProfit { .. } => "take_profit",
        }
    }

    /// Return that fired the trigger.
    #[must_use]
    pub const fn return_rate(&self) -> Decimal {
        match self {
            Self::StopLoss { return_rate } | Self::TakeProfit { return_rate } => *return_rate,
        }
    }
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = (self.return_rate() * Decimal::ONE_HUNDRED).round_dp(2);
        match self {
            Self::StopLoss { .. } => write!(f, "stop-loss at {pct}%"),
            Self::TakeProfit { .. } => write!(f, "take-profit at {pct}%"),
        }
    }
}

/// Exit trigger for `position` at `current_price`, if any.
#[must_use]
pub fn evaluate_exit(
    position: &Position,
    current_price: Decimal,
    config: &RiskConfig,
) -> Option<ExitTrigger> {
    let return_rate = position.unrealized_return(current_price)?;
    if return_rate <= config.stop_loss_rate {
        Some(ExitTrigger::StopLoss { return_rate })
    } else if return_rate >= config.take_profit_rate {
        Some(ExitTrigger::TakeProfit { return_rate })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;
    use crate::domain::shared::InstrumentId;

    fn position() -> Position {
        Position::open(
            InstrumentId::new("005930").unwrap(),
            dec!(100000),
            10,
            Utc::now(),
        )
    }

    #[test_case(dec!(94900), Some("stop_loss") ; "below stop")]
    #[test_case(dec!(95000), Some("stop_loss") ; "exactly at stop")]
    #[test_case(dec!(95100), None ; "above stop")]
    #[test_case(dec!(115001), Some("take_profit") ; "above target")]
    #[test_case(dec!(115000), Some("take_profit") ; "exactly at target")]
    #[test_case(dec!(114999), None ; "below target")]
    #[test_case(dec!(100000), None ; "flat")]
    fn thresholds(price: Decimal, expected: Option<&str>) {
        let trigger = evaluate_exit(&position(), price, &RiskConfig::default());
        assert_eq!(trigger.map(|t| t.label()), expected);
    }

    #[test]
    fn display_shows_percentage() {
        let trigger = evaluate_exit(&position(), dec!(94900), &RiskConfig::default()).unwrap();
        assert_eq!(trigger.to_string(), "stop-loss at -5.10%");
    }
}
