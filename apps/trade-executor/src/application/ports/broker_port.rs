//! Broker Port (Driven Port)
//!
//! Interface to the brokerage. Implementations must treat the client order
//! id as the broker-side deduplication key.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{IdempotencyKey, OrderSide};
use crate::domain::shared::{BrokerOrderId, InstrumentId};

/// Market order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Client order id.
    pub client_order_id: IdempotencyKey,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Shares.
    pub quantity: u64,
    /// Reference price, used by the simulator when it has no quote.
    pub reference_price: Decimal,
}

/// Broker-side order state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BrokerOrderStatus {
    /// Accepted and working (including partially filled).
    Working,
    /// Completely filled.
    Filled {
        /// Filled shares.
        quantity: u64,
        /// Average fill price.
        avg_price: Decimal,
    },
    /// Refused.
    Rejected {
        /// Broker reason.
        reason: String,
    },
    /// Cancelled or expired without a fill.
    Cancelled {
        /// Broker reason.
        reason: String,
    },
}

/// An order as the broker reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerOrder {
    /// Broker id.
    pub broker_order_id: BrokerOrderId,
    /// Echoed client order id.
    pub client_order_id: Option<String>,
    /// State.
    pub status: BrokerOrderStatus,
}

/// One holding in the brokerage account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Shares.
    pub quantity: u64,
    /// Average entry price.
    pub avg_price: Decimal,
}

/// Cash and holdings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Available cash.
    pub cash: Decimal,
    /// Holdings.
    pub holdings: Vec<Holding>,
}

/// Broker port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Connection failed or was reset.
    #[error("broker transport error: {message}")]
    Transport {
        /// Details.
        message: String,
    },

    /// Request timed out.
    #[error("broker request timed out")]
    Timeout,

    /// Rate limited.
    #[error("rate limited by broker")]
    RateLimited {
        /// Broker-suggested delay.
        retry_after: Option<Duration>,
    },

    /// Broker-side outage (5xx).
    #[error("broker unavailable ({status}): {message}")]
    Unavailable {
        /// HTTP status.
        status: u16,
        /// Details.
        message: String,
    },

    /// Credentials refused.
    #[error("broker authentication failed: {message}")]
    Authentication {
        /// Details.
        message: String,
    },

    /// Not enough cash.
    #[error("insufficient funds: {message}")]
    InsufficientFunds {
        /// Details.
        message: String,
    },

    /// Unknown or untradable instrument.
    #[error("invalid instrument {instrument}")]
    InvalidInstrument {
        /// Instrument.
        instrument: String,
    },

    /// Order refused for another reason.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Broker reason.
        reason: String,
    },

    /// Unknown order id.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// Requested id.
        order_id: String,
    },

    /// Response could not be understood.
    #[error("unexpected broker response: {message}")]
    Protocol {
        /// Details.
        message: String,
    },
}

impl BrokerError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout | Self::RateLimited { .. } | Self::Unavailable { .. }
        )
    }

    /// Metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Unavailable { .. } => "unavailable",
            Self::Authentication { .. } => "authentication",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidInstrument { .. } => "invalid_instrument",
            Self::Rejected { .. } => "rejected",
            Self::OrderNotFound { .. } => "not_found",
            Self::Protocol { .. } => "protocol",
        }
    }
}

/// Port for broker interactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Place a market order. Resending the same client order id must not
    /// create a second order.
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<BrokerOrderId, BrokerError>;

    /// Current state of an order.
    async fn get_order_status(&self, broker_order_id: &BrokerOrderId)
    -> Result<BrokerOrder, BrokerError>;

    /// Look up an order by client order id; `None` if the broker never saw it.
    async fn find_order(
        &self,
        client_order_id: &IdempotencyKey,
    ) -> Result<Option<BrokerOrder>, BrokerError>;

    /// Latest trade price.
    async fn get_price(&self, instrument_id: &InstrumentId) -> Result<Decimal, BrokerError>;

    /// Cash and holdings.
    async fn get_balance(&self) -> Result<Balance, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BrokerError::Timeout.is_transient());
        assert!(BrokerError::RateLimited { retry_after: None }.is_transient());
        assert!(
            BrokerError::Unavailable {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !BrokerError::InsufficientFunds {
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !BrokerError::Authentication {
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !BrokerError::InvalidInstrument {
                instrument: "X".into()
            }
            .is_transient()
        );
    }
}
