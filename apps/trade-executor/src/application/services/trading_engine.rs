//! Trading engine: Risk Gate → Position Sizer → Coordinator.
//!
//! Every entry point that can move money goes through [`TradingEngine::submit`]:
//! the daily routine, the position monitor, manual orders and liquidation.
//! Gate evaluation and key reservation happen under one store lock, so two
//! concurrent buys cannot both pass the daily limit.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::coordinator::{OrderExecutionCoordinator, Reservation};
use super::state_store::StateStore;
use crate::application::ports::{BrokerPort, Notification, NotifierPort, notify_detached};
use crate::domain::order_execution::{
    IdempotencyKey, Order, OrderResult, OrderSide, OrderStatus,
};
use crate::domain::portfolio::{Ledger, Mutation, Position};
use crate::domain::recommendation::{Action, Recommendation, RecommendationSource};
use crate::domain::risk_management::{
    Decision, HaltReason, RejectReason, RiskContext, RiskGate, exit_quantity,
};
use crate::domain::shared::{InstrumentId, TradingMode};
use crate::domain::sizing::{PositionSizer, SizingError, Strategy};
use crate::error::EngineError;
use crate::observability;

/// What happened to one recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Passed the gate and reached the coordinator.
    Executed {
        /// Coordinator result.
        result: OrderResult,
    },
    /// Refused by the gate; this trade only.
    Rejected {
        /// Why.
        reason: RejectReason,
    },
    /// Refused because trading is halted.
    Halted {
        /// Why.
        reason: HaltReason,
    },
    /// Approved amount buys no whole share.
    Unsizable {
        /// Approved amount.
        amount: Decimal,
        /// Share price.
        price: Decimal,
    },
    /// Hold; nothing to do.
    Skipped,
}

impl SubmissionOutcome {
    /// Order result, if one was produced.
    #[must_use]
    pub const fn result(&self) -> Option<&OrderResult> {
        match self {
            Self::Executed { result } => Some(result),
            _ => None,
        }
    }

    /// Whether an order ended filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.result().is_some_and(|r| r.status == OrderStatus::Filled)
    }
}

/// Operator-requested trade. Still gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrder {
    /// Instrument symbol.
    pub instrument: String,
    /// Side.
    pub side: OrderSide,
    /// Shares.
    pub quantity: u64,
    /// Reference price.
    pub price: Decimal,
    /// Pin the intent sequence to make the request replayable.
    #[serde(default)]
    pub intent_seq: Option<u64>,
}

/// Copy-out view of the engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Trading day.
    pub trading_day: NaiveDate,
    /// Account mode.
    pub mode: TradingMode,
    /// Active strategy.
    pub strategy: Strategy,
    /// Operator pause.
    pub paused: bool,
    /// Buys filled today.
    pub buy_count: u32,
    /// Daily buy limit.
    pub max_buys_per_day: u32,
    /// Realized P&L today.
    pub realized_pnl: Decimal,
    /// Portfolio value at day start.
    pub day_start_value: Decimal,
    /// P&L at which buys halt.
    pub loss_floor: Decimal,
    /// Whether the loss floor has been reached.
    pub loss_limit_breached: bool,
    /// Cash.
    pub cash: Decimal,
    /// Cash plus cost basis.
    pub portfolio_value: Decimal,
    /// Positions.
    pub positions: Vec<Position>,
    /// Orders reserved or working.
    pub in_flight: Vec<OrderResult>,
    /// Ledger revision.
    pub revision: u64,
    /// Snapshot time.
    pub as_of: DateTime<Utc>,
}

enum Plan {
    Order(Order),
    Done(SubmissionOutcome),
}

/// Entry point for everything that trades.
pub struct TradingEngine<B>
where
    B: BrokerPort + 'static,
{
    store: Arc<StateStore>,
    gate: RiskGate,
    coordinator: Arc<OrderExecutionCoordinator<B>>,
    notifier: Arc<dyn NotifierPort>,
}

impl<B> TradingEngine<B>
where
    B: BrokerPort + 'static,
{
    /// Create an engine.
    pub fn new(
        gate: RiskGate,
        coordinator: Arc<OrderExecutionCoordinator<B>>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            store: Arc::clone(coordinator.store()),
            gate,
            coordinator,
            notifier,
        }
    }

    /// State store.
    #[must_use]
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Risk gate.
    #[must_use]
    pub const fn gate(&self) -> &RiskGate {
        &self.gate
    }

    /// Coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<OrderExecutionCoordinator<B>> {
        &self.coordinator
    }

    /// Notifier.
    #[must_use]
    pub const fn notifier(&self) -> &Arc<dyn NotifierPort> {
        &self.notifier
    }

    /// Run one recommendation through the gate and, if approved, execute it.
    pub async fn submit(&self, rec: Recommendation) -> Result<SubmissionOutcome, EngineError> {
        let outcome = self.submit_inner(&rec).await;
        match &outcome {
            Ok(SubmissionOutcome::Executed { result }) => {
                tracing::info!(
                    instrument = %rec.instrument_id(),
                    action = %rec.action(),
                    source = %rec.source(),
                    status = %result.status,
                    "Recommendation executed"
                );
            }
            Ok(SubmissionOutcome::Rejected { reason }) => {
                self.notify_blocked(&rec, reason.to_string(), false);
            }
            Ok(SubmissionOutcome::Halted { reason }) => {
                self.notify_blocked(&rec, reason.to_string(), true);
            }
            Ok(SubmissionOutcome::Unsizable { amount, price }) => {
                tracing::info!(
                    instrument = %rec.instrument_id(),
                    %amount,
                    %price,
                    "Approved amount buys no shares, skipping"
                );
            }
            Ok(SubmissionOutcome::Skipped) => {}
            Err(e) => {
                tracing::error!(
                    instrument = %rec.instrument_id(),
                    action = %rec.action(),
                    error = %e,
                    "Recommendation failed"
                );
                if e.is_fatal() {
                    notify_detached(
                        &self.notifier,
                        Notification::SystemError {
                            message: format!("state store unavailable, trading stopped: {e}"),
                        },
                    );
                }
            }
        }
        outcome
    }

    async fn submit_inner(&self, rec: &Recommendation) -> Result<SubmissionOutcome, EngineError> {
        let Some(side) = rec.action().side() else {
            return Ok(SubmissionOutcome::Skipped);
        };

        let reservation = {
            let mut guard = self.store.lock().await?;
            let order = match self.plan(guard.ledger(), rec, side, guard.now()) {
                Plan::Order(order) => order,
                Plan::Done(outcome) => return Ok(outcome),
            };
            self.coordinator.reserve(&mut guard, order).await?
        };

        let fresh = reservation.is_fresh();
        let result = self.coordinator.complete(reservation).await?;
        if fresh {
            notify_detached(
                &self.notifier,
                Notification::OrderCompleted {
                    result: result.clone(),
                    source: rec.source(),
                },
            );
        }
        Ok(SubmissionOutcome::Executed { result })
    }

    fn plan(
        &self,
        ledger: &Ledger,
        rec: &Recommendation,
        side: OrderSide,
        now: DateTime<Utc>,
    ) -> Plan {
        let instrument_id = rec.instrument_id();
        let trading_day = ledger.daily.trading_day;

        // A pinned intent that already reached the broker is a replay: hand
        // back the recorded order without gating it again.
        if let Some(seq) = rec.intent_seq()
            && let Some(existing) = ledger
                .orders
                .get(&IdempotencyKey::derive(instrument_id, side, trading_day, seq))
            && !matches!(existing.status, OrderStatus::Rejected | OrderStatus::Failed)
        {
            return Plan::Order(existing.clone());
        }

        let decision = self
            .gate
            .evaluate(rec, &RiskContext::from_ledger(ledger, rec));
        observability::record_risk_decision(decision.label(), side.as_str());
        let amount = match decision {
            Decision::Approved { amount } => amount,
            Decision::Rejected(reason) => return Plan::Done(SubmissionOutcome::Rejected { reason }),
            Decision::Halted(reason) => return Plan::Done(SubmissionOutcome::Halted { reason }),
        };

        let quantity = match side {
            OrderSide::Buy => {
                let strategy = self.gate.sizer().strategy();
                if !strategy.allows_reentry() && ledger.bought_today(instrument_id) {
                    return Plan::Done(SubmissionOutcome::Rejected {
                        reason: RejectReason::AlreadyTradedToday,
                    });
                }
                match PositionSizer::quantity(amount, rec.proposed_price()) {
                    Ok(quantity) => quantity,
                    Err(SizingError::Unsizable { amount, price }) => {
                        return Plan::Done(SubmissionOutcome::Unsizable { amount, price });
                    }
                }
            }
            OrderSide::Sell => match ledger.portfolio.positions.get(instrument_id) {
                Some(position) => exit_quantity(rec, position),
                None => {
                    return Plan::Done(SubmissionOutcome::Rejected {
                        reason: RejectReason::NoOpenPosition,
                    });
                }
            },
        };

        let seq = rec
            .intent_seq()
            .unwrap_or_else(|| ledger.next_intent_seq(instrument_id, side));
        Plan::Order(Order::pending(
            instrument_id.clone(),
            side,
            quantity,
            rec.proposed_price(),
            trading_day,
            seq,
            now,
        ))
    }

    fn notify_blocked(&self, rec: &Recommendation, reason: String, halted: bool) {
        tracing::info!(
            instrument = %rec.instrument_id(),
            action = %rec.action(),
            source = %rec.source(),
            reason = %reason,
            halted,
            "Recommendation blocked by risk gate"
        );
        notify_detached(
            &self.notifier,
            Notification::RiskBlocked {
                instrument_id: rec.instrument_id().clone(),
                action: rec.action(),
                reason,
                halted,
            },
        );
    }

    /// Operator trade; passes the same gate as everything else.
    pub async fn manual_order(&self, order: ManualOrder) -> Result<SubmissionOutcome, EngineError> {
        let action = match order.side {
            OrderSide::Buy => Action::Buy,
            OrderSide::Sell => Action::Sell,
        };
        let mut rec = Recommendation::new(
            InstrumentId::new(&order.instrument)?,
            action,
            Decimal::ONE,
            order.price,
            RecommendationSource::Manual,
        )?
        .with_quantity(order.quantity)?;
        if let Some(seq) = order.intent_seq {
            rec = rec.with_intent_seq(seq);
        }
        self.submit(rec).await
    }

    /// Pause trading for the rest of the day.
    pub async fn pause(&self) -> Result<(), EngineError> {
        self.store.commit(Mutation::SetPaused { paused: true }).await?;
        tracing::warn!("Trading paused by operator");
        notify_detached(&self.notifier, Notification::TradingPaused);
        Ok(())
    }

    /// Lift the pause.
    pub async fn resume(&self) -> Result<(), EngineError> {
        self.store.commit(Mutation::SetPaused { paused: false }).await?;
        tracing::info!("Trading resumed by operator");
        notify_detached(&self.notifier, Notification::TradingResumed);
        Ok(())
    }

    /// Consistent snapshot for display.
    pub async fn status(&self) -> Result<StatusReport, EngineError> {
        let ledger = self.store.snapshot().await?;
        let config = self.gate.config();
        Ok(StatusReport {
            trading_day: ledger.daily.trading_day,
            mode: ledger.mode,
            strategy: self.gate.sizer().strategy(),
            paused: ledger.daily.paused,
            buy_count: ledger.daily.buy_count,
            max_buys_per_day: config.max_buys_per_day,
            realized_pnl: ledger.daily.realized_pnl,
            day_start_value: ledger.daily.day_start_value,
            loss_floor: ledger.daily.loss_floor(config.max_daily_loss_rate),
            loss_limit_breached: ledger
                .daily
                .loss_limit_breached(config.max_daily_loss_rate),
            cash: ledger.portfolio.cash,
            portfolio_value: ledger.portfolio.value(),
            positions: ledger.portfolio.positions.values().cloned().collect(),
            in_flight: ledger.in_flight_orders().map(OrderResult::from).collect(),
            revision: ledger.revision,
            as_of: self.store.now(),
        })
    }

    /// Exit every open position at the latest price.
    ///
    /// Stops at the first fatal error; other per-position errors are logged.
    pub async fn liquidate_all(
        &self,
        source: RecommendationSource,
    ) -> Result<Vec<(InstrumentId, SubmissionOutcome)>, EngineError> {
        let snapshot = self.store.snapshot().await?;
        let mut outcomes = Vec::new();
        for position in snapshot.portfolio.open_positions() {
            let instrument_id = position.instrument_id.clone();
            let price = match self.coordinator.broker().get_price(&instrument_id).await {
                Ok(price) if price > Decimal::ZERO => price,
                Ok(_) | Err(_) => {
                    tracing::warn!(
                        instrument = %instrument_id,
                        "No usable quote for liquidation, using entry price"
                    );
                    position.entry_price
                }
            };
            let rec = Recommendation::exit(instrument_id.clone(), price, source)?;
            match self.submit(rec).await {
                Ok(outcome) => outcomes.push((instrument_id, outcome)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::ManualClock;
    use crate::application::services::FillPolling;
    use crate::broker::BrokerRetryPolicy;
    use crate::domain::risk_management::RiskConfig;
    use crate::domain::shared::TradingCalendar;
    use crate::infrastructure::broker::SimulatedBroker;
    use crate::infrastructure::notifier::LogNotifier;
    use crate::infrastructure::persistence::InMemoryStateBackend;

    async fn engine(strategy: Strategy) -> (TradingEngine<SimulatedBroker>, Arc<SimulatedBroker>) {
        let clock = Arc::new(ManualClock::new("2026-03-03T01:00:00Z".parse().unwrap()));
        let store = Arc::new(
            StateStore::open(
                Arc::new(InMemoryStateBackend::new()),
                TradingCalendar::from_utc_offset_hours(9),
                clock,
                TradingMode::Simulated,
                dec!(100000000),
            )
            .await
            .unwrap(),
        );
        let broker = Arc::new(SimulatedBroker::new(dec!(100000000)));
        let coordinator = Arc::new(OrderExecutionCoordinator::new(
            store,
            Arc::clone(&broker),
            BrokerRetryPolicy::immediate(3),
            FillPolling::default(),
        ));
        let engine = TradingEngine::new(
            RiskGate::new(RiskConfig::default(), PositionSizer::new(strategy)),
            coordinator,
            Arc::new(LogNotifier),
        );
        (engine, broker)
    }

    fn buy(symbol: &str, confidence: Decimal, price: Decimal) -> Recommendation {
        Recommendation::new(
            InstrumentId::new(symbol).unwrap(),
            Action::Buy,
            confidence,
            price,
            RecommendationSource::DecisionSource,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn hold_is_skipped() {
        let (engine, broker) = engine(Strategy::ConfidenceWeighted).await;
        let rec = Recommendation::new(
            InstrumentId::new("005930").unwrap(),
            Action::Hold,
            dec!(0.9),
            dec!(70000),
            RecommendationSource::DecisionSource,
        )
        .unwrap();
        assert_eq!(engine.submit(rec).await.unwrap(), SubmissionOutcome::Skipped);
        assert_eq!(broker.submissions(), 0);
    }

    #[tokio::test]
    async fn confidence_sizes_the_order() {
        let (engine, _) = engine(Strategy::ConfidenceWeighted).await;
        let outcome = engine
            .submit(buy("005930", dec!(0.3), dec!(10000)))
            .await
            .unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.quantity, 30);
    }

    #[tokio::test]
    async fn unsizable_amount_creates_no_order() {
        let (engine, broker) = engine(Strategy::ConfidenceWeighted).await;
        let outcome = engine
            .submit(buy("BRK.A", dec!(0.1), dec!(700000)))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Unsizable { .. }));
        assert_eq!(broker.submissions(), 0);
    }

    #[tokio::test]
    async fn scalping_refuses_same_day_reentry() {
        let (engine, _) = engine(Strategy::Scalping).await;
        assert!(
            engine
                .submit(buy("005930", dec!(1), dec!(10000)))
                .await
                .unwrap()
                .is_filled()
        );
        let second = engine
            .submit(buy("005930", dec!(1), dec!(10000)))
            .await
            .unwrap();
        assert_eq!(
            second,
            SubmissionOutcome::Rejected {
                reason: RejectReason::AlreadyTradedToday
            }
        );
    }

    #[tokio::test]
    async fn manual_sell_without_position_is_rejected() {
        let (engine, broker) = engine(Strategy::ConfidenceWeighted).await;
        let outcome = engine
            .manual_order(ManualOrder {
                instrument: "005930".into(),
                side: OrderSide::Sell,
                quantity: 5,
                price: dec!(70000),
                intent_seq: None,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: RejectReason::NoOpenPosition
            }
        );
        assert_eq!(broker.submissions(), 0);
    }

    #[tokio::test]
    async fn manual_order_rejects_bad_symbol() {
        let (engine, _) = engine(Strategy::ConfidenceWeighted).await;
        let err = engine
            .manual_order(ManualOrder {
                instrument: "no spaces".into(),
                side: OrderSide::Buy,
                quantity: 5,
                price: dec!(70000),
                intent_seq: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code().http_status(), 400);
    }

    #[tokio::test]
    async fn liquidation_exits_everything() {
        let (engine, broker) = engine(Strategy::Scalping).await;
        engine
            .submit(buy("005930", dec!(1), dec!(10000)))
            .await
            .unwrap();
        engine
            .submit(buy("000660", dec!(1), dec!(20000)))
            .await
            .unwrap();
        broker.set_price(&InstrumentId::new("005930").unwrap(), dec!(10100));

        let outcomes = engine
            .liquidate_all(RecommendationSource::Liquidation)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| o.is_filled()));

        let status = engine.status().await.unwrap();
        assert!(status.positions.is_empty());
        assert_eq!(status.realized_pnl, dec!(1000));
    }
}
