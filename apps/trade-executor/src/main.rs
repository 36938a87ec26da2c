//! Trade Executor Binary
//!
//! Starts the risk gate, order execution, position monitor, daily routine
//! and operator HTTP surface.
//!
//! # Usage
//!
//! ```bash
//! TRADER_CONFIG=config.yaml cargo run --bin trade-executor
//! ```
//!
//! # Environment Variables
//!
//! - `TRADER_CONFIG`: path of the YAML config (default: config.yaml)
//! - `RUST_LOG`: overrides the configured log level
//! - Anything referenced as `${VAR}` in the config file

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use trade_executor::application::ports::{BrokerPort, NotifierPort, SystemClock};
use trade_executor::application::services::{
    DailyRoutine, OrderExecutionCoordinator, PositionMonitor, StateStore, TradingEngine,
};
use trade_executor::application::use_cases::ReconcileUseCase;
use trade_executor::config::{Config, load_config};
use trade_executor::domain::risk_management::RiskGate;
use trade_executor::domain::shared::TradingMode;
use trade_executor::domain::sizing::PositionSizer;
use trade_executor::infrastructure::broker::{AlpacaBrokerAdapter, SimulatedBroker};
use trade_executor::infrastructure::decision_source::JsonFileDecisionSource;
use trade_executor::infrastructure::http::{AppState, create_router};
use trade_executor::infrastructure::notifier::{LogNotifier, WebhookNotifier};
use trade_executor::infrastructure::persistence::JsonFileStateBackend;
use trade_executor::observability::{LogFormat, init_metrics, init_tracing};

/// Graceful shutdown timeout for background tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = load_config(None).context("loading configuration")?;

    let format: LogFormat = config.observability.logging.format.parse()?;
    init_tracing(&config.observability.logging.level, format)?;

    if let Some(addr) = config
        .observability
        .metrics
        .listen_addr
        .as_deref()
        .filter(|a| !a.is_empty())
    {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid metrics address '{addr}'"))?;
        init_metrics(addr)?;
    }

    tracing::info!(
        mode = %config.mode,
        strategy = %config.strategy,
        state_path = %config.persistence.state_path,
        "Starting trade executor"
    );

    match config.mode {
        TradingMode::Simulated => {
            let store = open_store(&config, config.brokers.simulated.starting_cash).await?;
            // The paper account lives only in this process; resume it from the ledger.
            let (_, portfolio) = store.load().await.context("loading portfolio")?;
            let broker = SimulatedBroker::from_portfolio(&portfolio);
            run(store, Arc::new(broker), config).await
        }
        TradingMode::Live | TradingMode::Paper => {
            let alpaca = config
                .brokers
                .alpaca_config(config.mode)
                .context("no Alpaca settings for mode")?;
            if alpaca.environment.is_live() {
                tracing::warn!("LIVE trading enabled: orders move real money");
            }
            let broker = AlpacaBrokerAdapter::new(&alpaca)?;
            // Cash is synced from the broker by the startup reconciliation.
            let store = open_store(&config, Decimal::ZERO).await?;
            run(store, Arc::new(broker), config).await
        }
    }
}

async fn open_store(config: &Config, initial_cash: Decimal) -> anyhow::Result<Arc<StateStore>> {
    let store = StateStore::open(
        Arc::new(JsonFileStateBackend::new(&config.persistence.state_path)),
        config.exchange.calendar(),
        Arc::new(SystemClock),
        config.mode,
        initial_cash,
    )
    .await
    .context("opening state store")?;
    Ok(Arc::new(store))
}

async fn run<B>(store: Arc<StateStore>, broker: Arc<B>, config: Config) -> anyhow::Result<()>
where
    B: BrokerPort + 'static,
{

    let notifier = create_notifier(&config)?;
    let coordinator = Arc::new(OrderExecutionCoordinator::new(
        store,
        broker,
        config.brokers.retry.to_policy(),
        config.brokers.fill_poll.to_polling(),
    ));
    let engine = Arc::new(TradingEngine::new(
        RiskGate::new(config.risk.clone(), PositionSizer::new(config.strategy)),
        Arc::clone(&coordinator),
        Arc::clone(&notifier),
    ));

    let reconcile = Arc::new(ReconcileUseCase::new(
        Arc::clone(&coordinator),
        Arc::clone(&notifier),
    ));
    let report = reconcile
        .execute(config.reconciliation.sync_balance)
        .await
        .context("startup reconciliation")?;
    tracing::info!(
        checked = report.checked,
        corrections = report.corrections(),
        errors = report.errors.len(),
        "Startup reconciliation complete"
    );

    let shutdown = CancellationToken::new();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    tasks.push(
        Arc::new(PositionMonitor::new(
            Arc::clone(&engine),
            config.monitor.to_monitor_config(),
        ))
        .spawn(shutdown.clone()),
    );

    if config.reconciliation.enabled {
        tasks.push(Arc::clone(&reconcile).spawn(
            config.reconciliation.interval(),
            config.reconciliation.sync_balance,
            shutdown.clone(),
        ));
    }

    let source = Arc::new(JsonFileDecisionSource::new(
        config.schedule.recommendation_file.clone(),
    ));
    tasks.push(
        Arc::new(DailyRoutine::new(
            Arc::clone(&engine),
            source,
            config.schedule.to_schedule()?,
        ))
        .spawn(shutdown.clone()),
    );

    if config.server.enabled {
        serve_http(&config, engine, shutdown.clone()).await?;
    } else {
        shutdown_signal().await;
    }

    shutdown.cancel();
    tracing::info!("Waiting for background tasks");
    let join_all = futures::future::join_all(tasks);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all).await.is_err() {
        tracing::warn!("Background tasks did not stop in time");
    }

    tracing::info!("Trade executor stopped");
    Ok(())
}

fn create_notifier(config: &Config) -> anyhow::Result<Arc<dyn NotifierPort>> {
    match &config.notifier.webhook_url {
        Some(url) if !url.is_empty() => {
            let notifier =
                WebhookNotifier::new(url.clone(), Duration::from_secs(config.notifier.timeout_secs))?;
            tracing::info!("Webhook notifications enabled");
            Ok(Arc::new(notifier))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}

/// Serve the command surface until ctrl-c.
async fn serve_http<B>(
    config: &Config,
    engine: Arc<TradingEngine<B>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    B: BrokerPort + 'static,
{
    let app = create_router(AppState {
        engine,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/v1/status");
    tracing::info!("  POST /api/v1/recommendations");
    tracing::info!("  POST /api/v1/orders/manual");
    tracing::info!("  POST /api/v1/trading/pause");
    tracing::info!("  POST /api/v1/trading/resume");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
