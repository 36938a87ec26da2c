//! The risk gate.
//!
//! Rules for buys, first failing rule wins:
//!
//! 1. operator pause → `Halted(paused)`
//! 2. filled plus in-flight buys at the daily maximum → `Rejected(daily buy limit)`
//! 3. realized P&L at or below the daily loss floor → `Halted(daily loss limit)`
//! 4. held plus in-flight plus new exposure above the position cap → `Rejected(position cap)`
//! 5. sized amount clamped into the order-amount bounds
//!
//! Sells skip rules 2-5 and exit the held quantity. The pause applies to
//! them only when `pause_blocks_exits` is set.

use rust_decimal::Decimal;

use super::{Decision, HaltReason, RejectReason, RiskConfig};
use crate::domain::portfolio::{DailyState, Ledger, Portfolio, Position, PositionStatus};
use crate::domain::recommendation::{Action, Recommendation};
use crate::domain::sizing::PositionSizer;

/// State the gate evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext<'a> {
    /// Today's counters.
    pub daily: &'a DailyState,
    /// Cash and positions.
    pub portfolio: &'a Portfolio,
    /// Buys reserved or working today.
    pub pending_buys: u32,
    /// Notional of in-flight buys in the recommended instrument.
    pub pending_exposure: Decimal,
}

impl<'a> RiskContext<'a> {
    /// Context for `rec` read from the ledger.
    #[must_use]
    pub fn from_ledger(ledger: &'a Ledger, rec: &Recommendation) -> Self {
        Self {
            daily: &ledger.daily,
            portfolio: &ledger.portfolio,
            pending_buys: ledger.pending_buy_count(),
            pending_exposure: ledger.pending_buy_exposure(rec.instrument_id()),
        }
    }
}

/// Validates recommendations against [`RiskConfig`].
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
    sizer: PositionSizer,
}

impl RiskGate {
    /// Gate enforcing `config`, sizing buys with `sizer`.
    #[must_use]
    pub const fn new(config: RiskConfig, sizer: PositionSizer) -> Self {
        Self { config, sizer }
    }

    /// Limits in force.
    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Sizer used for buys.
    #[must_use]
    pub const fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }

    /// Evaluate one recommendation.
    #[must_use]
    pub fn evaluate(&self, rec: &Recommendation, ctx: &RiskContext<'_>) -> Decision {
        match rec.action() {
            Action::Buy => self.evaluate_buy(rec, ctx),
            Action::Sell => self.evaluate_sell(rec, ctx),
            Action::Hold => Decision::Rejected(RejectReason::Invalid(
                "hold carries no order".to_string(),
            )),
        }
    }

    fn evaluate_buy(&self, rec: &Recommendation, ctx: &RiskContext<'_>) -> Decision {
        if ctx.daily.paused {
            return Decision::Halted(HaltReason::Paused);
        }

        if ctx.daily.buy_count + ctx.pending_buys >= self.config.max_buys_per_day {
            return Decision::Rejected(RejectReason::DailyBuyLimit);
        }

        if ctx.daily.loss_limit_breached(self.config.max_daily_loss_rate) {
            return Decision::Halted(HaltReason::DailyLossLimit);
        }

        if ctx
            .portfolio
            .positions
            .get(rec.instrument_id())
            .is_some_and(|p| p.status == PositionStatus::Closing)
        {
            return Decision::Rejected(RejectReason::PositionBusy);
        }

        let amount = self.sizer.size(rec, &self.config);
        let held = ctx.portfolio.exposure(rec.instrument_id());
        let cap = self.config.max_position_fraction * ctx.portfolio.value();
        if held + ctx.pending_exposure + amount > cap {
            return Decision::Rejected(RejectReason::PositionCap);
        }

        Decision::Approved { amount }
    }

    fn evaluate_sell(&self, rec: &Recommendation, ctx: &RiskContext<'_>) -> Decision {
        if ctx.daily.paused && self.config.pause_blocks_exits {
            return Decision::Halted(HaltReason::Paused);
        }

        match ctx.portfolio.positions.get(rec.instrument_id()) {
            Some(p) if p.status == PositionStatus::Closing => {
                Decision::Rejected(RejectReason::PositionBusy)
            }
            Some(p) if p.status == PositionStatus::Open && p.quantity > 0 => {
                let quantity = exit_quantity(rec, p);
                Decision::Approved {
                    amount: rec.proposed_price() * Decimal::from(quantity),
                }
            }
            _ => Decision::Rejected(RejectReason::NoOpenPosition),
        }
    }
}

/// Shares a sell recommendation exits: the pinned quantity capped at the
/// holding, or the whole holding.
#[must_use]
pub fn exit_quantity(rec: &Recommendation, position: &Position) -> u64 {
    rec.quantity()
        .map_or(position.quantity, |q| q.min(position.quantity))
}
