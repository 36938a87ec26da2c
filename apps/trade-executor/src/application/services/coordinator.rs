//! Order Execution Coordinator
//!
//! Reserves an idempotency key under the store lock, releases the lock, talks
//! to the broker, then re-acquires the lock to record the outcome. Submission
//! runs on its own task so a caller that goes away does not strand a
//! reservation half-way.
//!
//! A key being driven has a `watch` channel in `in_flight`; concurrent
//! callers for the same key subscribe to it instead of submitting again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::state_store::{StateStore, StoreError, StoreGuard};
use crate::application::ports::{BrokerError, BrokerOrderStatus, BrokerPort, PlaceOrderRequest};
use crate::broker::{BrokerRetryPolicy, ExponentialBackoffCalculator};
use crate::domain::order_execution::{Fill, IdempotencyKey, Order, OrderResult, OrderStatus};
use crate::domain::portfolio::{LedgerError, Mutation};
use crate::domain::shared::BrokerOrderId;
use crate::error::EngineError;
use crate::observability;

/// How long to wait for a fill after the broker accepts an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillPolling {
    /// Delay between status queries.
    pub interval: Duration,
    /// Status queries before leaving the order `submitted`.
    pub max_polls: u32,
}

impl Default for FillPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_polls: 20,
        }
    }
}

/// Outcome of reserving a key.
#[derive(Debug)]
pub enum Reservation {
    /// Key reserved by this call; the order must be driven.
    Fresh {
        /// Reserved order.
        order: Order,
        /// Probe the broker before the first send.
        probe_first: bool,
    },
    /// Key already settled or acknowledged; nothing to send.
    Existing(OrderResult),
    /// Another caller is driving the key.
    InFlight {
        /// Order key.
        key: IdempotencyKey,
        /// Completion signal.
        receiver: watch::Receiver<Option<OrderResult>>,
    },
}

impl Reservation {
    /// Whether this call will contact the broker.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

type InFlight = HashMap<IdempotencyKey, watch::Sender<Option<OrderResult>>>;

/// Submits orders idempotently and records outcomes.
pub struct OrderExecutionCoordinator<B>
where
    B: BrokerPort + 'static,
{
    store: Arc<StateStore>,
    broker: Arc<B>,
    retry: BrokerRetryPolicy,
    polling: FillPolling,
    in_flight: Mutex<InFlight>,
}

impl<B> OrderExecutionCoordinator<B>
where
    B: BrokerPort + 'static,
{
    /// Create a coordinator.
    pub fn new(
        store: Arc<StateStore>,
        broker: Arc<B>,
        retry: BrokerRetryPolicy,
        polling: FillPolling,
    ) -> Self {
        Self {
            store,
            broker,
            retry,
            polling,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// State store.
    #[must_use]
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Broker.
    #[must_use]
    pub const fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    /// Whether a task in this process is currently driving `key`.
    #[must_use]
    pub fn is_driving(&self, key: &IdempotencyKey) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// `execute(Order) -> OrderResult`.
    pub async fn execute(self: &Arc<Self>, order: Order) -> Result<OrderResult, EngineError> {
        let reservation = {
            let mut guard = self.store.lock().await?;
            self.reserve(&mut guard, order).await?
        };
        self.complete(reservation).await
    }

    /// Reserve `order`'s key under the caller's lock.
    ///
    /// Must be followed by [`complete`](Self::complete) after the lock is
    /// released.
    pub async fn reserve(
        &self,
        guard: &mut StoreGuard<'_>,
        order: Order,
    ) -> Result<Reservation, StoreError> {
        let key = order.key;
        if let Some(tx) = self.in_flight.lock().get(&key) {
            return Ok(Reservation::InFlight {
                key,
                receiver: tx.subscribe(),
            });
        }

        let mut probe_first = false;
        if let Some(existing) = guard.ledger().orders.get(&key) {
            match existing.status {
                OrderStatus::Filled | OrderStatus::Submitted | OrderStatus::Pending => {
                    tracing::debug!(
                        key = %key,
                        status = %existing.status,
                        "Idempotent re-entry, returning recorded result"
                    );
                    return Ok(Reservation::Existing(OrderResult::from(existing)));
                }
                OrderStatus::Failed => probe_first = true,
                OrderStatus::Rejected => {}
            }
        }

        guard
            .commit(Mutation::Reserve {
                order: order.clone(),
            })
            .await?;
        let (tx, _) = watch::channel(None);
        self.in_flight.lock().insert(key, tx);
        tracing::info!(
            key = %key,
            instrument = %order.instrument_id,
            side = %order.side,
            quantity = order.quantity,
            "Order reserved"
        );
        Ok(Reservation::Fresh { order, probe_first })
    }

    /// Drive a reservation to its result. Must be called without the lock.
    pub async fn complete(
        self: &Arc<Self>,
        reservation: Reservation,
    ) -> Result<OrderResult, EngineError> {
        match reservation {
            Reservation::Existing(result) => Ok(result),
            Reservation::Fresh { order, probe_first } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.drive(order, probe_first).await })
                    .await
                    .map_err(|e| EngineError::Task(e.to_string()))?
            }
            Reservation::InFlight { key, mut receiver } => {
                let settled = receiver
                    .wait_for(Option::is_some)
                    .await
                    .ok()
                    .and_then(|r| (*r).clone());
                if let Some(result) = settled {
                    return Ok(result);
                }
                // Driver ended without a result; the store has the last word.
                self.store
                    .order_result(key)
                    .await?
                    .ok_or(EngineError::Ledger(LedgerError::UnknownOrder(key)))
            }
        }
    }

    async fn drive(&self, order: Order, probe_first: bool) -> Result<OrderResult, EngineError> {
        let key = order.key;
        let outcome = self.submit_and_record(&order, probe_first).await;
        let result = match outcome {
            Ok(()) => self.store.order_result(key).await,
            Err(e) => Err(e),
        };

        let tx = self.in_flight.lock().remove(&key);
        if let Some(tx) = tx {
            tx.send_replace(result.as_ref().ok().cloned().flatten());
        }

        let result = result?.ok_or(EngineError::Ledger(LedgerError::UnknownOrder(key)))?;
        observability::record_order_outcome(result.side.as_str(), &result.status.to_string());
        tracing::info!(
            key = %key,
            instrument = %result.instrument_id,
            side = %result.side,
            status = %result.status,
            broker_order_id = ?result.broker_order_id,
            "Order execution finished"
        );
        Ok(result)
    }

    async fn submit_and_record(&self, order: &Order, probe_first: bool) -> Result<(), StoreError> {
        let key = order.key;
        let request = PlaceOrderRequest {
            client_order_id: key,
            instrument_id: order.instrument_id.clone(),
            side: order.side,
            quantity: order.quantity,
            reference_price: order.requested_price,
        };

        let mut backoff = ExponentialBackoffCalculator::new(&self.retry);
        let mut probe = probe_first;
        let broker_order_id = loop {
            if probe && let Some(id) = self.probe(&key).await {
                break id;
            }
            match self.broker.place_order(&request).await {
                Ok(id) => break id,
                Err(e) => match backoff.delay_for(&e) {
                    Some(delay) => {
                        observability::record_broker_retry(e.kind());
                        tracing::warn!(
                            key = %key,
                            attempt = backoff.attempts_made(),
                            max_attempts = self.retry.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Order submission failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        probe = true;
                    }
                    None => return self.record_submit_failure(key, &e, backoff.attempts_made()).await,
                },
            }
        };

        self.store
            .commit(Mutation::MarkSubmitted {
                key,
                broker_order_id: broker_order_id.clone(),
                at: self.store.now(),
            })
            .await?;
        tracing::info!(key = %key, broker_order_id = %broker_order_id, "Order accepted by broker");

        self.await_fill(key, &broker_order_id).await
    }

    /// Whether the broker already holds an order for `key`; a lookup failure
    /// counts as "unknown" and the send goes ahead under the same client id.
    async fn probe(&self, key: &IdempotencyKey) -> Option<BrokerOrderId> {
        match self.broker.find_order(key).await {
            Ok(Some(found)) => {
                tracing::info!(
                    key = %key,
                    broker_order_id = %found.broker_order_id,
                    "Broker already holds this order, adopting it"
                );
                Some(found.broker_order_id)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Order lookup failed before resend");
                None
            }
        }
    }

    async fn record_submit_failure(
        &self,
        key: IdempotencyKey,
        error: &BrokerError,
        attempts: u32,
    ) -> Result<(), StoreError> {
        let at = self.store.now();
        let mutation = if error.is_transient() {
            tracing::error!(key = %key, attempts, error = %error, "Order submission retries exhausted");
            Mutation::RecordFailed {
                key,
                reason: format!("gave up after {attempts} attempts: {error}"),
                at,
            }
        } else {
            tracing::warn!(key = %key, error = %error, "Order rejected by broker");
            Mutation::RecordRejected {
                key,
                reason: error.to_string(),
                at,
            }
        };
        self.store.commit(mutation).await
    }

    async fn await_fill(
        &self,
        key: IdempotencyKey,
        broker_order_id: &BrokerOrderId,
    ) -> Result<(), StoreError> {
        for poll in 0..self.polling.max_polls {
            if poll > 0 {
                tokio::time::sleep(self.polling.interval).await;
            }
            let status = match self.broker.get_order_status(broker_order_id).await {
                Ok(order) => order.status,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Order status query failed");
                    continue;
                }
            };
            if let Some(mutation) = status_mutation(key, &status, self.store.now()) {
                return self.store.commit(mutation).await;
            }
        }
        tracing::info!(
            key = %key,
            broker_order_id = %broker_order_id,
            "Order still working, leaving it to reconciliation"
        );
        Ok(())
    }
}

/// Mutation that settles `key` given the broker's view, or `None` while the
/// order is still working.
#[must_use]
pub fn status_mutation(
    key: IdempotencyKey,
    status: &BrokerOrderStatus,
    now: DateTime<Utc>,
) -> Option<Mutation> {
    match status {
        BrokerOrderStatus::Working => None,
        BrokerOrderStatus::Filled {
            quantity,
            avg_price,
        } => Some(Mutation::RecordFill {
            key,
            fill: Fill {
                quantity: *quantity,
                price: *avg_price,
                filled_at: now,
            },
        }),
        BrokerOrderStatus::Rejected { reason } | BrokerOrderStatus::Cancelled { reason } => {
            Some(Mutation::RecordRejected {
                key,
                reason: reason.clone(),
                at: now,
            })
        }
    }
}
