//! Risk gate outcomes.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a recommendation was refused. Not retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// Today's buy allowance is used up.
    DailyBuyLimit,
    /// The instrument would exceed its share of the portfolio.
    PositionCap,
    /// Sell without an open position.
    NoOpenPosition,
    /// The position has an exit in flight.
    PositionBusy,
    /// The strategy does not re-enter an instrument bought today.
    AlreadyTradedToday,
    /// Malformed input.
    Invalid(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyBuyLimit => write!(f, "daily buy limit"),
            Self::PositionCap => write!(f, "position cap"),
            Self::NoOpenPosition => write!(f, "no open position"),
            Self::PositionBusy => write!(f, "exit in flight"),
            Self::AlreadyTradedToday => write!(f, "already traded today"),
            Self::Invalid(msg) => write!(f, "invalid recommendation: {msg}"),
        }
    }
}

/// Why trading is halted for a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// Operator pause.
    Paused,
    /// Realized loss reached the daily floor.
    DailyLossLimit,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => write!(f, "paused"),
            Self::DailyLossLimit => write!(f, "daily loss limit"),
        }
    }
}

/// Verdict of the risk gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Proceed with this order amount (already clamped for buys).
    Approved {
        /// Order amount in account currency.
        amount: Decimal,
    },
    /// Refused.
    Rejected(RejectReason),
    /// Refused because trading is halted.
    Halted(HaltReason),
}

impl Decision {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::Rejected(_) => "rejected",
            Self::Halted(_) => "halted",
        }
    }
}
