//! Scheduled daily routine.
//!
//! At the configured local order time on session days: pull the day's
//! recommendations, submit sells before buys. Strategies that stay flat
//! overnight also liquidate at the configured liquidation time.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::trading_engine::{SubmissionOutcome, TradingEngine};
use crate::application::ports::{
    BrokerPort, DecisionSourcePort, Notification, notify_detached,
};
use crate::domain::recommendation::{Action, RecommendationSource};
use crate::domain::shared::InstrumentId;
use crate::error::EngineError;

/// Routine timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Whether the routine runs.
    pub enabled: bool,
    /// Local time to place the day's orders.
    pub order_time: NaiveTime,
    /// Local time to exit everything, for strategies that liquidate.
    pub liquidation_time: NaiveTime,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order_time: NaiveTime::from_hms_opt(9, 5, 0).unwrap_or(NaiveTime::MIN),
            liquidation_time: NaiveTime::from_hms_opt(15, 10, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Result of one routine run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutineReport {
    /// Day the recommendations were fetched for.
    pub trading_day: Option<NaiveDate>,
    /// Valid recommendations received.
    pub fetched: usize,
    /// Entries refused by validation.
    pub invalid: usize,
    /// Per-recommendation outcome.
    pub outcomes: Vec<(InstrumentId, SubmissionOutcome)>,
    /// Non-fatal failures.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Orders,
    Liquidation,
}

/// Daily order routine.
pub struct DailyRoutine<B>
where
    B: BrokerPort + 'static,
{
    engine: Arc<TradingEngine<B>>,
    source: Arc<dyn DecisionSourcePort>,
    schedule: ScheduleConfig,
}

impl<B> DailyRoutine<B>
where
    B: BrokerPort + 'static,
{
    /// Routine pulling from `source`.
    pub fn new(
        engine: Arc<TradingEngine<B>>,
        source: Arc<dyn DecisionSourcePort>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            engine,
            source,
            schedule,
        }
    }

    /// Fetch today's recommendations and submit them, sells first.
    pub async fn run_once(&self) -> Result<RoutineReport, EngineError> {
        let store = self.engine.store();
        let trading_day = store.calendar().trading_day(store.now());
        let batch = self.source.fetch(trading_day).await?;

        for message in &batch.invalid {
            tracing::warn!(%trading_day, error = %message, "Dropping invalid recommendation");
        }

        let mut report = RoutineReport {
            trading_day: Some(trading_day),
            fetched: batch.recommendations.len(),
            invalid: batch.invalid.len(),
            ..RoutineReport::default()
        };

        let (sells, buys): (Vec<_>, Vec<_>) = batch
            .recommendations
            .into_iter()
            .filter(|r| r.action() != Action::Hold)
            .partition(|r| r.action() == Action::Sell);

        tracing::info!(
            %trading_day,
            sells = sells.len(),
            buys = buys.len(),
            invalid = report.invalid,
            "Running daily routine"
        );

        for rec in sells.into_iter().chain(buys) {
            let instrument_id = rec.instrument_id().clone();
            match self.engine.submit(rec).await {
                Ok(outcome) => report.outcomes.push((instrument_id, outcome)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.errors.push(format!("{instrument_id}: {e}")),
            }
        }
        Ok(report)
    }

    /// Exit every open position.
    pub async fn liquidate(&self) -> Result<RoutineReport, EngineError> {
        let store = self.engine.store();
        let outcomes = self
            .engine
            .liquidate_all(RecommendationSource::Liquidation)
            .await?;
        tracing::info!(exits = outcomes.len(), "Close-of-day liquidation finished");
        Ok(RoutineReport {
            trading_day: Some(store.calendar().trading_day(store.now())),
            outcomes,
            ..RoutineReport::default()
        })
    }

    fn next_event(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Event)> {
        let calendar = self.engine.store().calendar();
        let orders = calendar
            .next_occurrence(now, self.schedule.order_time)
            .map(|at| (at, Event::Orders));
        let liquidation = self
            .engine
            .gate()
            .sizer()
            .strategy()
            .liquidates_at_close()
            .then(|| calendar.next_occurrence(now, self.schedule.liquidation_time))
            .flatten()
            .map(|at| (at, Event::Liquidation));
        orders.into_iter().chain(liquidation).min_by_key(|(at, _)| *at)
    }

    /// Run on schedule until `shutdown` fires.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.schedule.enabled {
                tracing::info!("Daily routine disabled");
                return;
            }
            loop {
                let now = self.engine.store().now();
                let Some((at, event)) = self.next_event(now) else {
                    tracing::error!("No upcoming session found, daily routine stopping");
                    break;
                };
                tracing::info!(next_run = %at, event = ?event, "Daily routine scheduled");
                let wait = (at - now).to_std().unwrap_or_default();

                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Daily routine stopping");
                        break;
                    }
                    () = tokio::time::sleep(wait) => {
                        let run = match event {
                            Event::Orders => self.run_once().await,
                            Event::Liquidation => self.liquidate().await,
                        };
                        match run {
                            Ok(report) => tracing::info!(
                                event = ?event,
                                outcomes = report.outcomes.len(),
                                errors = report.errors.len(),
                                "Daily routine run finished"
                            ),
                            Err(e) => {
                                tracing::error!(event = ?event, error = %e, "Daily routine run failed");
                                notify_detached(
                                    self.engine.notifier(),
                                    Notification::SystemError {
                                        message: format!("daily routine ({event:?}) failed: {e}"),
                                    },
                                );
                            }
                        }
                    }
                }
            }
        })
    }
}

