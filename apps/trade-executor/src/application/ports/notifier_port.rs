//! Notifier Port (Driven Port)
//!
//! Delivery is fire-and-forget: a failed notification is logged and never
//! blocks or reverses a trading decision.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order_execution::{OrderResult, OrderStatus};
use crate::domain::recommendation::{Action, RecommendationSource};
use crate::domain::shared::InstrumentId;
use crate::domain::stop_enforcement::ExitTrigger;

/// Notification delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failed.
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    /// Endpoint answered with an error status.
    #[error("notification endpoint returned {0}")]
    Status(u16),
}

/// Events worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An order reached a final or working state at the broker.
    OrderCompleted {
        /// Result.
        result: OrderResult,
        /// Who asked for it.
        source: RecommendationSource,
    },
    /// The risk gate refused a recommendation.
    RiskBlocked {
        /// Instrument.
        instrument_id: InstrumentId,
        /// Requested action.
        action: Action,
        /// Rejection or halt reason.
        reason: String,
        /// Whether trading is halted rather than the single trade refused.
        halted: bool,
    },
    /// A position crossed an exit threshold.
    ExitTriggered {
        /// Instrument.
        instrument_id: InstrumentId,
        /// Threshold.
        trigger: ExitTrigger,
        /// Observed price.
        price: Decimal,
    },
    /// Realized loss reached the daily floor.
    DailyLossLimit {
        /// Realized P&L.
        realized_pnl: Decimal,
        /// Floor.
        floor: Decimal,
    },
    /// Operator paused trading for the day.
    TradingPaused,
    /// Operator resumed trading.
    TradingResumed,
    /// Reconciliation corrected local state.
    Reconciled {
        /// Summary.
        summary: String,
    },
    /// A fault needing operator attention.
    SystemError {
        /// Details.
        message: String,
    },
}

impl Notification {
    /// Short machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCompleted { .. } => "order_completed",
            Self::RiskBlocked { .. } => "risk_blocked",
            Self::ExitTriggered { .. } => "exit_triggered",
            Self::DailyLossLimit { .. } => "daily_loss_limit",
            Self::TradingPaused => "trading_paused",
            Self::TradingResumed => "trading_resumed",
            Self::Reconciled { .. } => "reconciled",
            Self::SystemError { .. } => "system_error",
        }
    }

    /// Human-readable text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::OrderCompleted { result, source } => match result.status {
                OrderStatus::Filled => format!(
                    "[{source}] {} {} x{} filled at {}",
                    result.side,
                    result.instrument_id,
                    result.filled_quantity,
                    result.fill_price.unwrap_or_default()
                ),
                OrderStatus::Submitted | OrderStatus::Pending => format!(
                    "[{source}] {} {} x{} accepted, awaiting fill",
                    result.side, result.instrument_id, result.quantity
                ),
                OrderStatus::Rejected | OrderStatus::Failed => format!(
                    "[{source}] {} {} x{} {}: {}",
                    result.side,
                    result.instrument_id,
                    result.quantity,
                    result.status,
                    result.reason.as_deref().unwrap_or("unknown reason")
                ),
            },
            Self::RiskBlocked {
                instrument_id,
                action,
                reason,
                halted,
            } => {
                let verb = if *halted { "halted" } else { "rejected" };
                format!("{action} {instrument_id} {verb}: {reason}")
            }
            Self::ExitTriggered {
                instrument_id,
                trigger,
                price,
            } => format!("{instrument_id} {trigger} (price {price}), exiting"),
            Self::DailyLossLimit {
                realized_pnl,
                floor,
            } => format!(
                "daily loss limit reached: realized {realized_pnl} <= {floor}; new buys halted"
            ),
            Self::TradingPaused => "trading paused for today".to_string(),
            Self::TradingResumed => "trading resumed".to_string(),
            Self::Reconciled { summary } => format!("reconciliation: {summary}"),
            Self::SystemError { message } => format!("error: {message}"),
        }
    }
}

/// Delivery of notifications.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver on a detached task; failures are logged.
pub fn notify_detached(notifier: &Arc<dyn NotifierPort>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            tracing::warn!(
                kind = notification.kind(),
                error = %e,
                "Notification delivery failed"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::risk_management::HaltReason;

    #[test]
    fn risk_block_message_names_reason() {
        let n = Notification::RiskBlocked {
            instrument_id: InstrumentId::new("005930").unwrap(),
            action: Action::Buy,
            reason: HaltReason::DailyLossLimit.to_string(),
            halted: true,
        };
        assert_eq!(n.message(), "buy 005930 halted: daily loss limit");
        assert_eq!(n.kind(), "risk_blocked");
    }

    #[test]
    fn loss_limit_message() {
        let n = Notification::DailyLossLimit {
            realized_pnl: dec!(-310000),
            floor: dec!(-300000),
        };
        assert!(n.message().contains("-310000"));
    }
}
