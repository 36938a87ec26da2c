//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API for operators and external recommendation producers.
//! Every trade still goes through the risk gate.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::ports::BrokerPort;
use crate::application::services::{ManualOrder, StatusReport, SubmissionOutcome, TradingEngine};
use crate::domain::recommendation::{Recommendation, RecommendationInput};
use crate::error::EngineError;

use super::response::{CommandResponse, HealthResponse};

/// Application state shared across handlers.
pub struct AppState<B>
where
    B: BrokerPort + 'static,
{
    /// Trading engine.
    pub engine: Arc<TradingEngine<B>>,
    /// Application version.
    pub version: String,
}

impl<B> Clone for AppState<B>
where
    B: BrokerPort + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<B>(state: AppState<B>) -> Router
where
    B: BrokerPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status", get(status))
        .route("/api/v1/recommendations", post(submit_recommendation))
        .route("/api/v1/orders/manual", post(manual_order))
        .route("/api/v1/trading/pause", post(pause))
        .route("/api/v1/trading/resume", post(resume))
        .with_state(state)
}

async fn health_check<B>(State(state): State<AppState<B>>) -> impl IntoResponse
where
    B: BrokerPort + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

async fn status<B>(State(state): State<AppState<B>>) -> Result<Json<StatusReport>, EngineError>
where
    B: BrokerPort + 'static,
{
    Ok(Json(state.engine.status().await?))
}

async fn submit_recommendation<B>(
    State(state): State<AppState<B>>,
    Json(input): Json<RecommendationInput>,
) -> Result<Json<SubmissionOutcome>, EngineError>
where
    B: BrokerPort + 'static,
{
    let rec = Recommendation::try_from(input)?;
    tracing::info!(
        instrument = %rec.instrument_id(),
        action = %rec.action(),
        source = %rec.source(),
        "Recommendation received over HTTP"
    );
    Ok(Json(state.engine.submit(rec).await?))
}

async fn manual_order<B>(
    State(state): State<AppState<B>>,
    Json(order): Json<ManualOrder>,
) -> Result<Json<SubmissionOutcome>, EngineError>
where
    B: BrokerPort + 'static,
{
    tracing::info!(
        instrument = %order.instrument,
        side = %order.side,
        quantity = order.quantity,
        "Manual order requested"
    );
    Ok(Json(state.engine.manual_order(order).await?))
}

async fn pause<B>(State(state): State<AppState<B>>) -> Result<Json<CommandResponse>, EngineError>
where
    B: BrokerPort + 'static,
{
    state.engine.pause().await?;
    Ok(Json(CommandResponse { paused: true }))
}

async fn resume<B>(State(state): State<AppState<B>>) -> Result<Json<CommandResponse>, EngineError>
where
    B: BrokerPort + 'static,
{
    state.engine.resume().await?;
    Ok(Json(CommandResponse { paused: false }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::ManualClock;
    use crate::application::services::{FillPolling, OrderExecutionCoordinator, StateStore};
    use crate::broker::BrokerRetryPolicy;
    use crate::domain::risk_management::{RiskConfig, RiskGate};
    use crate::domain::shared::{TradingCalendar, TradingMode};
    use crate::domain::sizing::{PositionSizer, Strategy};
    use crate::error::HttpErrorResponse;
    use crate::infrastructure::broker::SimulatedBroker;
    use crate::infrastructure::notifier::LogNotifier;
    use crate::infrastructure::persistence::InMemoryStateBackend;

    async fn create_test_state() -> AppState<SimulatedBroker> {
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
            broker,
            BrokerRetryPolicy::immediate(3),
            FillPolling::default(),
        ));
        let engine = TradingEngine::new(
            RiskGate::new(
                RiskConfig::default(),
                PositionSizer::new(Strategy::ConfidenceWeighted),
            ),
            coordinator,
            Arc::new(LogNotifier),
        );
        AppState {
            engine: Arc::new(engine),
            version: "1.0.0-test".to_string(),
        }
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_router(create_test_state().await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.version, "1.0.0-test");
    }

    #[tokio::test]
    async fn invalid_confidence_is_bad_request() {
        let app = create_router(create_test_state().await);
        let body = serde_json::json!({
            "instrument_id": "005930",
            "action": "buy",
            "confidence": "1.5",
            "proposed_price": "70000"
        });

        let response = app
            .oneshot(post_json("/api/v1/recommendations", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: HttpErrorResponse = body_json(response).await;
        assert_eq!(error.code, "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn pause_then_buy_is_halted() {
        let state = create_test_state().await;
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/trading/pause", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = serde_json::json!({
            "instrument_id": "005930",
            "action": "buy",
            "confidence": "0.8",
            "proposed_price": "70000"
        });
        let response = app
            .oneshot(post_json("/api/v1/recommendations", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome: serde_json::Value = body_json(response).await;
        assert_eq!(outcome["outcome"], "halted");
        assert!(state.engine.status().await.unwrap().paused);
    }

    #[tokio::test]
    async fn status_reports_mode_and_cash() {
        let app = create_router(create_test_state().await);

        let response = app
            .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report: StatusReport = body_json(response).await;
        assert_eq!(report.mode, TradingMode::Simulated);
        assert_eq!(report.cash, dec!(100000000));
        assert_eq!(report.buy_count, 0);
    }
}
