//! Shared harness for integration tests: a trading engine wired to the
//! simulated broker, an in-memory state backend and a manual clock.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trade_executor::application::ports::{ManualClock, Notification, NotifierPort, NotifyError};
use trade_executor::application::services::{
    FillPolling, OrderExecutionCoordinator, PositionMonitor, PositionMonitorConfig, StateStore,
    TradingEngine,
};
use trade_executor::application::use_cases::ReconcileUseCase;
use trade_executor::broker::BrokerRetryPolicy;
use trade_executor::domain::recommendation::{Action, Recommendation, RecommendationSource};
use trade_executor::domain::risk_management::{RiskConfig, RiskGate};
use trade_executor::domain::shared::{InstrumentId, TradingCalendar, TradingMode};
use trade_executor::domain::sizing::{PositionSizer, Strategy};
use trade_executor::infrastructure::broker::SimulatedBroker;
use trade_executor::infrastructure::persistence::InMemoryStateBackend;

/// Tuesday 2026-03-03 10:00 at +09:00.
pub const START: &str = "2026-03-03T01:00:00Z";

/// Starting cash for both the ledger and the simulated account.
pub const CASH: Decimal = dec!(100000000);

/// Notifier that keeps every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Notification::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|n| n.kind() == kind).count()
    }

    /// Notifications are delivered on detached tasks; give them a moment.
    pub async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.events.lock().push(notification.clone());
        Ok(())
    }
}

/// Everything a test needs to drive and inspect the engine.
pub struct Harness {
    pub engine: Arc<TradingEngine<SimulatedBroker>>,
    pub broker: Arc<SimulatedBroker>,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<InMemoryStateBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub risk: RiskConfig,
    pub strategy: Strategy,
}

pub struct HarnessBuilder {
    risk: RiskConfig,
    strategy: Strategy,
    cash: Decimal,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            strategy: Strategy::ConfidenceWeighted,
            cash: CASH,
        }
    }
}

impl HarnessBuilder {
    pub fn risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn cash(mut self, cash: Decimal) -> Self {
        self.cash = cash;
        self
    }

    pub async fn build(self) -> Harness {
        let clock = Arc::new(ManualClock::new(START.parse().unwrap()));
        let backend = Arc::new(InMemoryStateBackend::new());
        let broker = Arc::new(SimulatedBroker::new(self.cash));
        Harness::assemble(
            backend,
            broker,
            clock,
            self.risk,
            self.strategy,
            self.cash,
        )
        .await
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub async fn new() -> Self {
        Self::builder().build().await
    }

    async fn assemble(
        backend: Arc<InMemoryStateBackend>,
        broker: Arc<SimulatedBroker>,
        clock: Arc<ManualClock>,
        risk: RiskConfig,
        strategy: Strategy,
        cash: Decimal,
    ) -> Self {
        let store = Arc::new(
            StateStore::open(
                Arc::clone(&backend) as _,
                TradingCalendar::from_utc_offset_hours(9),
                Arc::clone(&clock) as _,
                TradingMode::Simulated,
                cash,
            )
            .await
            .unwrap(),
        );
        let coordinator = Arc::new(OrderExecutionCoordinator::new(
            store,
            Arc::clone(&broker),
            BrokerRetryPolicy::immediate(3),
            FillPolling {
                interval: Duration::from_millis(1),
                max_polls: 2,
            },
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = Arc::new(TradingEngine::new(
            RiskGate::new(risk.clone(), PositionSizer::new(strategy)),
            coordinator,
            Arc::clone(&notifier) as _,
        ));
        Self {
            engine,
            broker,
            clock,
            backend,
            notifier,
            risk,
            strategy,
        }
    }

    /// A new process over the same persisted state and broker account.
    pub async fn restart(&self) -> Self {
        Self::assemble(
            Arc::clone(&self.backend),
            Arc::clone(&self.broker),
            Arc::clone(&self.clock),
            self.risk.clone(),
            self.strategy,
            CASH,
        )
        .await
    }

    /// A new process over the same persisted state, talking to `broker`.
    pub async fn restart_with(&self, broker: Arc<SimulatedBroker>) -> Self {
        Self::assemble(
            Arc::clone(&self.backend),
            broker,
            Arc::clone(&self.clock),
            self.risk.clone(),
            self.strategy,
            CASH,
        )
        .await
    }

    pub fn store(&self) -> &Arc<StateStore> {
        self.engine.store()
    }

    pub fn monitor(&self) -> PositionMonitor<SimulatedBroker> {
        PositionMonitor::new(Arc::clone(&self.engine), PositionMonitorConfig::default())
    }

    pub fn reconciler(&self) -> ReconcileUseCase<SimulatedBroker> {
        ReconcileUseCase::new(
            Arc::clone(self.engine.coordinator()),
            Arc::clone(&self.notifier) as _,
        )
    }
}

pub fn instrument(symbol: &str) -> InstrumentId {
    InstrumentId::new(symbol).unwrap()
}

pub fn buy(symbol: &str, confidence: Decimal, price: Decimal) -> Recommendation {
    Recommendation::new(
        instrument(symbol),
        Action::Buy,
        confidence,
        price,
        RecommendationSource::DecisionSource,
    )
    .unwrap()
}

pub fn sell(symbol: &str, price: Decimal) -> Recommendation {
    Recommendation::new(
        instrument(symbol),
        Action::Sell,
        dec!(1),
        price,
        RecommendationSource::DecisionSource,
    )
    .unwrap()
}

/// Buy with an explicit share count.
pub fn buy_shares(symbol: &str, quantity: u64, price: Decimal) -> Recommendation {
    buy(symbol, dec!(1), price).with_quantity(quantity).unwrap()
}
