//! Reconcile Use Case
//!
//! Brings the ledger back in line with the broker, which is ground truth.
//! Runs before any trading at startup and then periodically.
//!
//! 1. Every `pending`/`submitted` order not being driven in this process is
//!    looked up at the broker (by broker id, else by client order id) and its
//!    outcome is committed exactly as the coordinator would have.
//! 2. Once nothing is in flight, cash is synced and positions are adopted or
//!    dropped to match the broker's holdings.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    BrokerError, BrokerOrder, BrokerOrderStatus, BrokerPort, Holding, Notification, NotifierPort,
    notify_detached,
};
use crate::application::services::{OrderExecutionCoordinator, StoreError, status_mutation};
use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::portfolio::{LedgerError, Mutation, Position, PositionStatus};
use crate::domain::shared::InstrumentId;
use crate::error::EngineError;
use crate::observability;

/// Reconciliation result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    /// In-flight orders looked up.
    pub checked: usize,
    /// Orders completed as filled.
    pub filled: usize,
    /// Orders completed as rejected or cancelled.
    pub rejected: usize,
    /// Orders the broker never saw.
    pub failed: usize,
    /// Orders still working at the broker.
    pub still_working: usize,
    /// Orders settled by someone else while we looked.
    pub already_resolved: usize,
    /// Whether the balance pass ran.
    pub balance_synced: bool,
    /// Whether cash was corrected.
    pub cash_adjusted: bool,
    /// Holdings adopted from the broker.
    pub adopted: Vec<InstrumentId>,
    /// Positions the broker does not hold.
    pub dropped: Vec<InstrumentId>,
    /// Positions whose size disagrees with the broker.
    pub quantity_mismatches: Vec<InstrumentId>,
    /// Lookup failures.
    pub errors: Vec<String>,
}

impl ReconciliationReport {
    /// Number of corrections applied to the ledger.
    #[must_use]
    pub fn corrections(&self) -> usize {
        self.filled
            + self.rejected
            + self.failed
            + usize::from(self.cash_adjusted)
            + self.adopted.len()
            + self.dropped.len()
    }

    /// Check if reconciliation was fully successful.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corrections() == 0 && self.quantity_mismatches.is_empty() && self.errors.is_empty()
    }

    fn summary(&self) -> String {
        let mut out = format!(
            "{} orders checked: {} filled, {} rejected, {} failed, {} working",
            self.checked, self.filled, self.rejected, self.failed, self.still_working
        );
        if self.cash_adjusted {
            out.push_str("; cash synced");
        }
        if !self.adopted.is_empty() {
            let _ = write!(out, "; adopted {}", join(&self.adopted));
        }
        if !self.dropped.is_empty() {
            let _ = write!(out, "; dropped {}", join(&self.dropped));
        }
        if !self.quantity_mismatches.is_empty() {
            let _ = write!(out, "; size mismatch {}", join(&self.quantity_mismatches));
        }
        out
    }
}

fn join(ids: &[InstrumentId]) -> String {
    ids.iter().map(InstrumentId::as_str).collect::<Vec<_>>().join(", ")
}

/// Use case for reconciling local state with the broker.
pub struct ReconcileUseCase<B>
where
    B: BrokerPort + 'static,
{
    coordinator: Arc<OrderExecutionCoordinator<B>>,
    notifier: Arc<dyn NotifierPort>,
}

impl<B> ReconcileUseCase<B>
where
    B: BrokerPort + 'static,
{
    /// Create a new `ReconcileUseCase`.
    pub fn new(
        coordinator: Arc<OrderExecutionCoordinator<B>>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            coordinator,
            notifier,
        }
    }

    /// Execute full reconciliation. Only persistence failures are errors;
    /// broker lookup failures are collected in the report.
    pub async fn execute(&self, sync_balance: bool) -> Result<ReconciliationReport, EngineError> {
        let mut report = ReconciliationReport::default();

        let snapshot = self.coordinator.store().snapshot().await?;
        let candidates: Vec<Order> = snapshot
            .in_flight_orders()
            .filter(|o| !self.coordinator.is_driving(&o.key))
            .cloned()
            .collect();
        for order in candidates {
            report.checked += 1;
            self.reconcile_order(&order, &mut report).await?;
        }

        if sync_balance {
            self.sync_balance(&mut report).await?;
        }

        if report.corrections() > 0 || !report.quantity_mismatches.is_empty() {
            tracing::warn!(summary = %report.summary(), "Reconciliation corrected local state");
            notify_detached(
                &self.notifier,
                Notification::Reconciled {
                    summary: report.summary(),
                },
            );
        } else {
            tracing::debug!(checked = report.checked, "Reconciliation found nothing to correct");
        }
        Ok(report)
    }

    async fn reconcile_order(
        &self,
        order: &Order,
        report: &mut ReconciliationReport,
    ) -> Result<(), EngineError> {
        let store = self.coordinator.store();
        let key = order.key;

        let found = match self.lookup(order).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Broker lookup failed during reconciliation");
                report.errors.push(format!("{key}: {e}"));
                return Ok(());
            }
        };

        let Some(found) = found else {
            tracing::warn!(
                key = %key,
                instrument = %order.instrument_id,
                status = %order.status,
                "Order unknown to broker, marking failed"
            );
            let mutation = Mutation::RecordFailed {
                key,
                reason: "never reached broker".to_string(),
                at: store.now(),
            };
            if self.apply(mutation, "failed").await? {
                report.failed += 1;
            } else {
                report.already_resolved += 1;
            }
            return Ok(());
        };

        if order.status == OrderStatus::Pending {
            let mutation = Mutation::MarkSubmitted {
                key,
                broker_order_id: found.broker_order_id.clone(),
                at: store.now(),
            };
            if !self.apply(mutation, "submitted").await? {
                report.already_resolved += 1;
                return Ok(());
            }
        }

        let Some(mutation) = status_mutation(key, &found.status, store.now()) else {
            report.still_working += 1;
            return Ok(());
        };

        tracing::warn!(
            key = %key,
            instrument = %order.instrument_id,
            broker_order_id = %found.broker_order_id,
            broker_status = ?found.status,
            "Recording broker outcome missing from local state"
        );
        let filled = matches!(found.status, BrokerOrderStatus::Filled { .. });
        let label = if filled { "filled" } else { "rejected" };
        if self.apply(mutation, label).await? {
            if filled {
                report.filled += 1;
            } else {
                report.rejected += 1;
            }
        } else {
            report.already_resolved += 1;
        }
        Ok(())
    }

    async fn lookup(&self, order: &Order) -> Result<Option<BrokerOrder>, BrokerError> {
        let broker = self.coordinator.broker();
        match &order.broker_order_id {
            Some(id) => match broker.get_order_status(id).await {
                Ok(found) => Ok(Some(found)),
                Err(BrokerError::OrderNotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            },
            None => broker.find_order(&order.key).await,
        }
    }

    /// Commit a correction; `false` if the order moved on in the meantime.
    async fn apply(&self, mutation: Mutation, kind: &'static str) -> Result<bool, EngineError> {
        match self.coordinator.store().commit(mutation).await {
            Ok(()) => {
                observability::record_reconciliation_correction(kind);
                Ok(true)
            }
            Err(StoreError::Ledger(LedgerError::InvalidTransition { .. })) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_balance(&self, report: &mut ReconciliationReport) -> Result<(), EngineError> {
        let store = self.coordinator.store();
        let before = store.snapshot().await?;
        if before.in_flight_orders().next().is_some() {
            tracing::info!("Orders still in flight, skipping balance sync");
            return Ok(());
        }

        let balance = match self.coordinator.broker().get_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(error = %e, "Balance fetch failed during reconciliation");
                report.errors.push(format!("balance: {e}"));
                return Ok(());
            }
        };

        let mut guard = store.lock().await?;
        if guard.ledger().revision != before.revision {
            tracing::info!("State changed during balance fetch, deferring balance sync");
            return Ok(());
        }
        report.balance_synced = true;

        let ledger = guard.ledger().clone();
        if balance.cash != ledger.portfolio.cash {
            tracing::warn!(
                local = %ledger.portfolio.cash,
                broker = %balance.cash,
                "Cash differs from broker, syncing"
            );
            guard.commit(Mutation::SyncCash { cash: balance.cash }).await?;
            observability::record_reconciliation_correction("cash");
            report.cash_adjusted = true;
        }

        let holdings: BTreeMap<&InstrumentId, &Holding> = balance
            .holdings
            .iter()
            .filter(|h| h.quantity > 0)
            .map(|h| (&h.instrument_id, h))
            .collect();

        for (instrument_id, holding) in &holdings {
            match ledger.portfolio.positions.get(*instrument_id) {
                None => {
                    tracing::warn!(
                        instrument = %instrument_id,
                        quantity = holding.quantity,
                        avg_price = %holding.avg_price,
                        "Broker holding missing locally, adopting"
                    );
                    let position = Position::open(
                        (*instrument_id).clone(),
                        holding.avg_price,
                        holding.quantity,
                        guard.now(),
                    );
                    guard.commit(Mutation::AdoptPosition { position }).await?;
                    observability::record_reconciliation_correction("adopted");
                    report.adopted.push((*instrument_id).clone());
                }
                Some(position) if position.quantity != holding.quantity => {
                    tracing::warn!(
                        instrument = %instrument_id,
                        local = position.quantity,
                        broker = holding.quantity,
                        "Position size differs from broker"
                    );
                    report.quantity_mismatches.push((*instrument_id).clone());
                }
                Some(_) => {}
            }
        }

        for (instrument_id, position) in &ledger.portfolio.positions {
            if position.status == PositionStatus::Open && !holdings.contains_key(instrument_id) {
                tracing::warn!(
                    instrument = %instrument_id,
                    quantity = position.quantity,
                    "Position not held at broker, dropping"
                );
                guard
                    .commit(Mutation::DropPosition {
                        instrument_id: instrument_id.clone(),
                    })
                    .await?;
                observability::record_reconciliation_correction("dropped");
                report.dropped.push(instrument_id.clone());
            }
        }
        Ok(())
    }

    /// Sweep every `interval` until `shutdown` fires. The first sweep runs
    /// one interval after start; the startup pass is the caller's job.
    pub fn spawn(
        self: Arc<Self>,
        interval: Duration,
        sync_balance: bool,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Reconciliation loop stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.execute(sync_balance).await {
                            Ok(report) if !report.is_clean() => tracing::warn!(
                                corrections = report.corrections(),
                                errors = report.errors.len(),
                                "Periodic reconciliation corrected state"
                            ),
                            Ok(_) => tracing::debug!("Periodic reconciliation clean"),
                            Err(e) => tracing::error!(error = %e, "Periodic reconciliation failed"),
                        }
                    }
                }
            }
        })
    }
}
