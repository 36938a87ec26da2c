//! Recommendations: trade judgments entering the core.
//!
//! A recommendation is untrusted input. Construction validates every field,
//! and once built it is immutable.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderSide;
use crate::domain::shared::{DomainError, InstrumentId};

/// What the decision source wants done with an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Open or add to a position.
    Buy,
    /// Close a position.
    Sell,
    /// Do nothing.
    Hold,
}

impl Action {
    /// Order side for actionable recommendations.
    #[must_use]
    pub const fn side(&self) -> Option<OrderSide> {
        match self {
            Self::Buy => Some(OrderSide::Buy),
            Self::Sell => Some(OrderSide::Sell),
            Self::Hold => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Hold => write!(f, "hold"),
        }
    }
}

/// Who produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// External decision source via the daily routine.
    DecisionSource,
    /// Synthetic exit from the position monitor.
    PositionMonitor,
    /// Operator override command.
    Manual,
    /// End-of-day liquidation.
    Liquidation,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DecisionSource => "decision_source",
            Self::PositionMonitor => "position_monitor",
            Self::Manual => "manual",
            Self::Liquidation => "liquidation",
        };
        f.write_str(name)
    }
}

/// Wire form of a recommendation, as supplied by external producers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationInput {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Requested action.
    pub action: Action,
    /// Confidence in [0, 1].
    pub confidence: Decimal,
    /// Reference price used for sizing.
    pub proposed_price: Decimal,
    /// Explicit share quantity (manual orders).
    #[serde(default)]
    pub quantity: Option<u64>,
    /// Caller-chosen intent sequence; resubmitting the same one collapses to one order.
    #[serde(default)]
    pub intent_seq: Option<u64>,
    /// Producer tag.
    #[serde(default = "default_source")]
    pub source: RecommendationSource,
    /// Creation time; defaults to receipt time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_source() -> RecommendationSource {
    RecommendationSource::DecisionSource
}

/// A validated, immutable trade judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecommendationInput")]
pub struct Recommendation {
    instrument_id: InstrumentId,
    action: Action,
    confidence: Decimal,
    proposed_price: Decimal,
    quantity: Option<u64>,
    intent_seq: Option<u64>,
    source: RecommendationSource,
    created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Build and validate a recommendation.
    pub fn new(
        instrument_id: InstrumentId,
        action: Action,
        confidence: Decimal,
        proposed_price: Decimal,
        source: RecommendationSource,
    ) -> Result<Self, DomainError> {
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(DomainError::invalid(
                "confidence",
                format!("{confidence} is outside [0, 1]"),
            ));
        }
        if proposed_price <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "proposed_price",
                format!("{proposed_price} must be positive"),
            ));
        }
        Ok(Self {
            instrument_id,
            action,
            confidence,
            proposed_price,
            quantity: None,
            intent_seq: None,
            source,
            created_at: Utc::now(),
        })
    }

    /// Full-confidence sell of whatever is held when the gate evaluates it.
    pub fn exit(
        instrument_id: InstrumentId,
        price: Decimal,
        source: RecommendationSource,
    ) -> Result<Self, DomainError> {
        Self::new(instrument_id, Action::Sell, Decimal::ONE, price, source)
    }

    /// Pin an explicit share quantity.
    pub fn with_quantity(mut self, quantity: u64) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::invalid("quantity", "must be at least 1"));
        }
        self.quantity = Some(quantity);
        Ok(self)
    }

    /// Pin the intent sequence used for the idempotency key.
    #[must_use]
    pub const fn with_intent_seq(mut self, seq: u64) -> Self {
        self.intent_seq = Some(seq);
        self
    }

    /// Override the creation timestamp.
    #[must_use]
    pub const fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Instrument.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Action.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Confidence in [0, 1].
    #[must_use]
    pub const fn confidence(&self) -> Decimal {
        self.confidence
    }

    /// Reference price.
    #[must_use]
    pub const fn proposed_price(&self) -> Decimal {
        self.proposed_price
    }

    /// Explicit quantity, if pinned.
    #[must_use]
    pub const fn quantity(&self) -> Option<u64> {
        self.quantity
    }

    /// Explicit intent sequence, if pinned.
    #[must_use]
    pub const fn intent_seq(&self) -> Option<u64> {
        self.intent_seq
    }

    /// Producer.
    #[must_use]
    pub const fn source(&self) -> RecommendationSource {
        self.source
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl TryFrom<RecommendationInput> for Recommendation {
    type Error = DomainError;

    fn try_from(input: RecommendationInput) -> Result<Self, Self::Error> {
        let instrument_id = InstrumentId::new(&input.instrument_id)?;
        let mut rec = Self::new(
            instrument_id,
            input.action,
            input.confidence,
            input.proposed_price,
            input.source,
        )?;
        if let Some(quantity) = input.quantity {
            rec = rec.with_quantity(quantity)?;
        }
        if let Some(seq) = input.intent_seq {
            rec = rec.with_intent_seq(seq);
        }
        if let Some(at) = input.created_at {
            rec = rec.with_created_at(at);
        }
        Ok(rec)
    }
}

impl From<Recommendation> for RecommendationInput {
    fn from(rec: Recommendation) -> Self {
        Self {
            instrument_id: rec.instrument_id.as_str().to_string(),
            action: rec.action,
            confidence: rec.confidence,
            proposed_price: rec.proposed_price,
            quantity: rec.quantity,
            intent_seq: rec.intent_seq,
            source: rec.source,
            created_at: Some(rec.created_at),
        }
    }
}
