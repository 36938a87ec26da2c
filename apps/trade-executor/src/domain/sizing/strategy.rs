//! Trading style variants.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::recommendation::Recommendation;
use crate::domain::risk_management::RiskConfig;

/// Trading style selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Daily entries sized by `default_order_amount × confidence`.
    #[default]
    ConfidenceWeighted,
    /// Small fixed-size momentum entries, flat by the close.
    Scalping,
}

impl Strategy {
    /// Amount before clamping.
    #[must_use]
    pub fn base_amount(&self, rec: &Recommendation, config: &RiskConfig) -> Decimal {
        if let Some(quantity) = rec.quantity() {
            return rec.proposed_price() * Decimal::from(quantity);
        }
        match self {
            Self::ConfidenceWeighted => config.default_order_amount * rec.confidence(),
            Self::Scalping => config.scalping_amount,
        }
    }

    /// Whether an instrument bought today may be bought again.
    #[must_use]
    pub const fn allows_reentry(&self) -> bool {
        matches!(self, Self::ConfidenceWeighted)
    }

    /// Whether every position is exited before the close.
    #[must_use]
    pub const fn liquidates_at_close(&self) -> bool {
        matches!(self, Self::Scalping)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfidenceWeighted => write!(f, "confidence_weighted"),
            Self::Scalping => write!(f, "scalping"),
        }
    }
}
