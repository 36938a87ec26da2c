//! Risk limits.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Hard limits enforced on every recommendation.
///
/// Loaded once at startup and immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Filled buys allowed per trading day.
    pub max_buys_per_day: u32,
    /// Smallest order amount; smaller sized amounts are clamped up.
    pub min_order_amount: Decimal,
    /// Largest order amount; larger sized amounts are clamped down.
    pub max_order_amount: Decimal,
    /// Base amount before confidence weighting.
    pub default_order_amount: Decimal,
    /// Largest share of portfolio value one instrument may hold.
    pub max_position_fraction: Decimal,
    /// Return at or below which a position is stopped out (negative).
    pub stop_loss_rate: Decimal,
    /// Return at or above which profit is taken (positive).
    pub take_profit_rate: Decimal,
    /// Daily realized loss, as a fraction of day-start value, that halts buys.
    pub max_daily_loss_rate: Decimal,
    /// Fixed amount per scalping entry.
    pub scalping_amount: Decimal,
    /// Whether the operator pause also blocks exits.
    pub pause_blocks_exits: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_buys_per_day: 3,
            min_order_amount: dec!(100000),
            max_order_amount: dec!(5000000),
            default_order_amount: dec!(1000000),
            max_position_fraction: dec!(0.2),
            stop_loss_rate: dec!(-0.05),
            take_profit_rate: dec!(0.15),
            max_daily_loss_rate: dec!(0.03),
            scalping_amount: dec!(100000),
            pause_blocks_exits: false,
        }
    }
}

impl RiskConfig {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_order_amount <= Decimal::ZERO {
            return Err(DomainError::invalid("min_order_amount", "must be positive"));
        }
        if self.min_order_amount > self.max_order_amount {
            return Err(DomainError::invalid(
                "min_order_amount",
                "must not exceed max_order_amount",
            ));
        }
        if self.default_order_amount <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "default_order_amount",
                "must be positive",
            ));
        }
        if self.max_position_fraction <= Decimal::ZERO || self.max_position_fraction > Decimal::ONE
        {
            return Err(DomainError::invalid(
                "max_position_fraction",
                "must be in (0, 1]",
            ));
        }
        if self.stop_loss_rate >= Decimal::ZERO || self.stop_loss_rate <= Decimal::NEGATIVE_ONE {
            return Err(DomainError::invalid("stop_loss_rate", "must be in (-1, 0)"));
        }
        if self.take_profit_rate <= Decimal::ZERO {
            return Err(DomainError::invalid("take_profit_rate", "must be positive"));
        }
        if self.max_daily_loss_rate <= Decimal::ZERO || self.max_daily_loss_rate >= Decimal::ONE {
            return Err(DomainError::invalid(
                "max_daily_loss_rate",
                "must be in (0, 1)",
            ));
        }
        if self.scalping_amount <= Decimal::ZERO {
            return Err(DomainError::invalid("scalping_amount", "must be positive"));
        }
        Ok(())
    }

    /// Clamp an amount into `[min_order_amount, max_order_amount]`.
    #[must_use]
    pub fn clamp_amount(&self, amount: Decimal) -> Decimal {
        amount.max(self.min_order_amount).min(self.max_order_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RiskConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let config = RiskConfig {
            min_order_amount: dec!(6000000),
            ..RiskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn positive_stop_loss_is_invalid() {
        let config = RiskConfig {
            stop_loss_rate: dec!(0.05),
            ..RiskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamp_respects_bounds() {
        let config = RiskConfig::default();
        assert_eq!(config.clamp_amount(dec!(20000)), dec!(100000));
        assert_eq!(config.clamp_amount(dec!(300000)), dec!(300000));
        assert_eq!(config.clamp_amount(dec!(9000000)), dec!(5000000));
    }
}
