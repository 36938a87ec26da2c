//! State Store
//!
//! Single serialization point for all mutable trading state. Every mutation
//! runs under one async mutex, is applied to a copy of the ledger, persisted,
//! and only then swapped in. A failed save leaves memory untouched.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::application::ports::{Clock, PersistenceError, StateBackend};
use crate::domain::order_execution::{IdempotencyKey, OrderResult};
use crate::domain::portfolio::{DailyState, Ledger, LedgerError, Mutation, Portfolio};
use crate::domain::shared::{TradingCalendar, TradingMode};
use crate::observability;

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backing storage failed; nothing was applied.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Mutation refused by the ledger; nothing was applied.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Durable, lock-guarded ledger.
pub struct StateStore {
    ledger: Mutex<Ledger>,
    backend: Arc<dyn StateBackend>,
    calendar: TradingCalendar,
    clock: Arc<dyn Clock>,
    mode: TradingMode,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("backend", &self.backend.describe())
            .field("calendar", &self.calendar)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Load the stored ledger, or create one holding `initial_cash`.
    ///
    /// Fails if the stored ledger was written in another trading mode.
    pub async fn open(
        backend: Arc<dyn StateBackend>,
        calendar: TradingCalendar,
        clock: Arc<dyn Clock>,
        mode: TradingMode,
        initial_cash: Decimal,
    ) -> Result<Self, StoreError> {
        let ledger = match backend.load().await? {
            Some(ledger) => {
                if ledger.mode != mode {
                    return Err(PersistenceError::ModeMismatch {
                        stored: ledger.mode,
                        configured: mode,
                    }
                    .into());
                }
                tracing::info!(
                    location = %backend.describe(),
                    trading_day = %ledger.daily.trading_day,
                    revision = ledger.revision,
                    positions = ledger.portfolio.positions.len(),
                    "Loaded trading state"
                );
                ledger
            }
            None => {
                let today = calendar.trading_day(clock.now());
                let ledger = Ledger::new(mode, today, initial_cash);
                backend.save(&ledger).await?;
                tracing::info!(
                    location = %backend.describe(),
                    trading_day = %today,
                    %initial_cash,
                    "Initialized new trading state"
                );
                ledger
            }
        };

        let store = Self {
            ledger: Mutex::new(ledger),
            backend,
            calendar,
            clock,
            mode,
        };
        drop(store.lock().await?);
        Ok(store)
    }

    /// Acquire the store, rolling the day over first if needed.
    pub async fn lock(&self) -> Result<StoreGuard<'_>, StoreError> {
        let mut guard = StoreGuard {
            ledger: self.ledger.lock().await,
            backend: self.backend.as_ref(),
            clock: self.clock.as_ref(),
        };
        let today = self.calendar.trading_day(self.clock.now());
        let stored = guard.ledger.daily.trading_day;
        if today > stored {
            tracing::info!(
                previous = %stored,
                current = %today,
                buy_count = guard.ledger.daily.buy_count,
                realized_pnl = %guard.ledger.daily.realized_pnl,
                "Trading day rolled over, archiving previous day"
            );
            guard.commit(Mutation::Rollover { trading_day: today }).await?;
        }
        Ok(guard)
    }

    /// Today's counters and the portfolio.
    pub async fn load(&self) -> Result<(DailyState, Portfolio), StoreError> {
        let guard = self.lock().await?;
        Ok((guard.ledger.daily.clone(), guard.ledger.portfolio.clone()))
    }

    /// Consistent copy of the whole ledger.
    pub async fn snapshot(&self) -> Result<Ledger, StoreError> {
        let guard = self.lock().await?;
        Ok(guard.ledger.clone())
    }

    /// Apply and persist one mutation.
    pub async fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        self.lock().await?.commit(mutation).await
    }

    /// Recorded result for `key`.
    pub async fn order_result(
        &self,
        key: IdempotencyKey,
    ) -> Result<Option<OrderResult>, StoreError> {
        let guard = self.lock().await?;
        Ok(guard.ledger.orders.get(&key).map(OrderResult::from))
    }

    /// Exchange calendar.
    #[must_use]
    pub const fn calendar(&self) -> TradingCalendar {
        self.calendar
    }

    /// Account mode.
    #[must_use]
    pub const fn mode(&self) -> TradingMode {
        self.mode
    }

    /// Current time from the store's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Exclusive access to the ledger.
pub struct StoreGuard<'a> {
    ledger: MutexGuard<'a, Ledger>,
    backend: &'a dyn StateBackend,
    clock: &'a dyn Clock,
}

impl StoreGuard<'_> {
    /// Current ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply `mutation` to a copy, persist the copy, then swap it in.
    pub async fn commit(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        let started = Instant::now();
        let mut next = self.ledger.clone();
        next.apply(mutation)?;
        if let Err(e) = self.backend.save(&next).await {
            observability::record_persistence_failure();
            tracing::error!(
                location = %self.backend.describe(),
                error = %e,
                "State commit failed, mutation discarded"
            );
            return Err(e.into());
        }
        *self.ledger = next;
        observability::record_commit_latency(started.elapsed());
        Ok(())
    }
}
