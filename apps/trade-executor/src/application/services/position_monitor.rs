//! Position Monitor
//!
//! Polls prices for every open position on a fixed cadence and turns
//! stop-loss / take-profit crossings into full-size sell recommendations
//! that go through the same engine path as everything else. A position
//! being exited is `closing` and is skipped by later polls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::trading_engine::{SubmissionOutcome, TradingEngine};
use crate::application::ports::{BrokerPort, Notification, notify_detached};
use crate::domain::recommendation::{Recommendation, RecommendationSource};
use crate::domain::shared::InstrumentId;
use crate::domain::stop_enforcement::{ExitTrigger, evaluate_exit};
use crate::error::EngineError;
use crate::observability;

/// Monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionMonitorConfig {
    /// Whether the polling loop runs.
    pub enabled: bool,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for PositionMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// What one poll did.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Positions looked at.
    pub checked: usize,
    /// Positions without a usable (fetched, positive) price.
    pub price_errors: usize,
    /// Exits requested, with their outcome.
    pub exits: Vec<(InstrumentId, ExitTrigger, SubmissionOutcome)>,
}

/// Stop-loss / take-profit enforcement loop.
pub struct PositionMonitor<B>
where
    B: BrokerPort + 'static,
{
    engine: Arc<TradingEngine<B>>,
    config: PositionMonitorConfig,
    loss_alerted_on: Mutex<Option<NaiveDate>>,
}

impl<B> PositionMonitor<B>
where
    B: BrokerPort + 'static,
{
    /// Monitor submitting exits through `engine`.
    pub const fn new(engine: Arc<TradingEngine<B>>, config: PositionMonitorConfig) -> Self {
        Self {
            engine,
            config,
            loss_alerted_on: Mutex::new(None),
        }
    }

    /// One pass over the open positions.
    pub async fn poll_once(&self) -> Result<PollReport, EngineError> {
        let started = Instant::now();
        let snapshot = self.engine.store().snapshot().await?;
        let risk = self.engine.gate().config();
        let broker = self.engine.coordinator().broker();
        let mut report = PollReport::default();

        let open: Vec<_> = snapshot.portfolio.open_positions().cloned().collect();
        observability::set_open_positions(open.len());

        for position in open {
            report.checked += 1;
            let price = match broker.get_price(&position.instrument_id).await {
                Ok(price) if price > Decimal::ZERO => price,
                Ok(price) => {
                    report.price_errors += 1;
                    tracing::warn!(
                        instrument = %position.instrument_id,
                        %price,
                        "Non-positive price, skipping position this poll"
                    );
                    continue;
                }
                Err(e) => {
                    report.price_errors += 1;
                    tracing::warn!(
                        instrument = %position.instrument_id,
                        error = %e,
                        "Price fetch failed, skipping position this poll"
                    );
                    continue;
                }
            };

            let Some(trigger) = evaluate_exit(&position, price, risk) else {
                continue;
            };

            observability::record_exit_trigger(trigger.label());
            tracing::warn!(
                instrument = %position.instrument_id,
                entry_price = %position.entry_price,
                %price,
                trigger = %trigger,
                "Exit threshold crossed"
            );
            notify_detached(
                self.engine.notifier(),
                Notification::ExitTriggered {
                    instrument_id: position.instrument_id.clone(),
                    trigger,
                    price,
                },
            );

            let rec = Recommendation::exit(
                position.instrument_id.clone(),
                price,
                RecommendationSource::PositionMonitor,
            )?;
            match self.engine.submit(rec).await {
                Ok(outcome) => report.exits.push((position.instrument_id, trigger, outcome)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }

        self.check_loss_limit().await?;
        observability::record_monitor_poll(started.elapsed());
        Ok(report)
    }

    /// Alert once per day when realized losses reach the floor.
    async fn check_loss_limit(&self) -> Result<(), EngineError> {
        let (daily, _) = self.engine.store().load().await?;
        let rate = self.engine.gate().config().max_daily_loss_rate;
        if !daily.loss_limit_breached(rate) {
            return Ok(());
        }

        {
            let mut alerted = self.loss_alerted_on.lock();
            if *alerted == Some(daily.trading_day) {
                return Ok(());
            }
            *alerted = Some(daily.trading_day);
        }

        let floor = daily.loss_floor(rate);
        tracing::error!(
            trading_day = %daily.trading_day,
            realized_pnl = %daily.realized_pnl,
            %floor,
            "Daily loss limit reached, new buys halted"
        );
        notify_detached(
            self.engine.notifier(),
            Notification::DailyLossLimit {
                realized_pnl: daily.realized_pnl,
                floor,
            },
        );
        Ok(())
    }

    /// Run the polling loop until `shutdown` fires.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                tracing::info!("Position monitor disabled");
                return;
            }
            tracing::info!(
                poll_interval_secs = self.config.poll_interval.as_secs(),
                "Position monitor started"
            );

            let mut ticker = tokio::time::interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Position monitor stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.poll_once().await {
                            Ok(report) if !report.exits.is_empty() => {
                                tracing::info!(
                                    checked = report.checked,
                                    exits = report.exits.len(),
                                    "Position monitor poll requested exits"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "Position monitor poll failed"),
                        }
                    }
                }
            }
        })
    }
}
