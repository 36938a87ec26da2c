//! Converts recommendations into order amounts and share quantities.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use super::Strategy;
use crate::domain::recommendation::Recommendation;
use crate::domain::risk_management::RiskConfig;

/// Sizing outcomes that produce no order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizingError {
    /// Amount buys less than one share at the given price.
    #[error("amount {amount} buys no shares at {price}")]
    Unsizable {
        /// Order amount.
        amount: Decimal,
        /// Share price.
        price: Decimal,
    },
}

/// Sizes orders for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionSizer {
    strategy: Strategy,
}

impl PositionSizer {
    /// Sizer for `strategy`.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Active strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Order amount, always within `[min_order_amount, max_order_amount]`.
    #[must_use]
    pub fn size(&self, rec: &Recommendation, config: &RiskConfig) -> Decimal {
        config.clamp_amount(self.strategy.base_amount(rec, config))
    }

    /// Whole shares `amount` buys at `price`.
    pub fn quantity(amount: Decimal, price: Decimal) -> Result<u64, SizingError> {
        let unsizable = || SizingError::Unsizable { amount, price };
        if price <= Decimal::ZERO {
            return Err(unsizable());
        }
        let shares = (amount / price).floor().to_u64().unwrap_or(0);
        if shares == 0 {
            return Err(unsizable());
        }
        Ok(shares)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use super::Strategy;
    use crate::domain::recommendation::{Action, RecommendationSource};
    use crate::domain::shared::InstrumentId;

    fn rec(confidence: Decimal, price: Decimal) -> Recommendation {
        Recommendation::new(
            InstrumentId::new("005930").unwrap(),
            Action::Buy,
            confidence,
            price,
            RecommendationSource::DecisionSource,
        )
        .unwrap()
    }

    #[test]
    fn confidence_scales_default_amount() {
        let sizer = PositionSizer::new(Strategy::ConfidenceWeighted);
        let config = RiskConfig::default();
        assert_eq!(sizer.size(&rec(dec!(0.3), dec!(70000)), &config), dec!(300000));
    }

    #[test]
    fn low_confidence_is_clamped_up() {
        let sizer = PositionSizer::new(Strategy::ConfidenceWeighted);
        let config = RiskConfig::default();
        assert_eq!(sizer.size(&rec(dec!(0.02), dec!(70000)), &config), dec!(100000));
    }

    #[test]
    fn explicit_quantity_is_clamped_down() {
        let sizer = PositionSizer::new(Strategy::ConfidenceWeighted);
        let config = RiskConfig::default();
        let r = rec(Decimal::ONE, dec!(100000)).with_quantity(80).unwrap();
        assert_eq!(sizer.size(&r, &config), dec!(5000000));
    }

    #[test]
    fn scalping_uses_fixed_amount() {
        let sizer = PositionSizer::new(Strategy::Scalping);
        let config = RiskConfig::default();
        assert_eq!(sizer.size(&rec(dec!(0.9), dec!(5000)), &config), dec!(100000));
    }

    #[test]
    fn quantity_floors() {
        assert_eq!(PositionSizer::quantity(dec!(300000), dec!(70000)), Ok(4));
    }

    #[test]
    fn too_expensive_is_unsizable() {
        assert_eq!(
            PositionSizer::quantity(dec!(100000), dec!(250000)),
            Err(SizingError::Unsizable {
                amount: dec!(100000),
                price: dec!(250000)
            })
        );
    }

    proptest! {
        #[test]
        fn sized_amount_stays_within_bounds(
            confidence_bp in 0u32..=10_000,
            price in 1u64..10_000_000,
            default_amount in 1u64..50_000_000,
        ) {
            let config = RiskConfig {
                default_order_amount: Decimal::from(default_amount),
                ..RiskConfig::default()
            };
            let confidence = Decimal::from(confidence_bp) / Decimal::from(10_000);
            let r = rec(confidence, Decimal::from(price));
            let amount = PositionSizer::new(Strategy::ConfidenceWeighted).size(&r, &config);
            prop_assert!(amount >= config.min_order_amount);
            prop_assert!(amount <= config.max_order_amount);

            if let Ok(qty) = PositionSizer::quantity(amount, r.proposed_price()) {
                prop_assert!(Decimal::from(qty) * r.proposed_price() <= amount);
            }
        }
    }
}
