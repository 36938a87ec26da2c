//! HTTP client wrapper for the Alpaca REST API.
//!
//! One request, one attempt: retry policy lives in the coordinator, which
//! checks for an existing order before every resend.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api_types::AlpacaErrorResponse;
use super::config::AlpacaConfig;
use super::error::AlpacaError;
use crate::broker::is_retryable_status;

/// HTTP client for Alpaca API.
#[derive(Debug, Clone)]
pub struct AlpacaHttpClient {
    client: Client,
    api_key: String,
    api_secret: String,
    trading_base_url: String,
    data_base_url: String,
}

impl AlpacaHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &AlpacaConfig) -> Result<Self, AlpacaError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(AlpacaError::AuthenticationFailed(
                "missing API credentials".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AlpacaError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            trading_base_url: config.trading_base_url().trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// GET from the trading API.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AlpacaError> {
        let url = format!("{}{path}", self.trading_base_url);
        self.send(self.client.get(url), path).await
    }

    /// GET from the trading API; a 404 is `None`.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, AlpacaError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(AlpacaError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST JSON to the trading API.
    #[allow(clippy::future_not_send)]
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AlpacaError> {
        let url = format!("{}{path}", self.trading_base_url);
        self.send(self.client.post(url).json(body), path).await
    }

    /// GET from the market data API.
    pub async fn data_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AlpacaError> {
        let url = format!("{}{path}", self.data_base_url);
        self.send(self.client.get(url), path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, AlpacaError> {
        let response = request
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            return serde_json::from_str(&text).map_err(|e| AlpacaError::JsonParse(e.to_string()));
        }

        let error = error_from_response(response, path).await;
        tracing::debug!(path, status = status.as_u16(), error = %error, "Alpaca request failed");
        Err(error)
    }
}

async fn error_from_response(response: Response, path: &str) -> AlpacaError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<AlpacaErrorResponse>(&body) {
        Ok(err) => (
            err.code.unwrap_or_else(|| status.as_u16().to_string()),
            err.message,
        ),
        Err(_) => (status.as_u16().to_string(), body),
    };

    categorize(status, retry_after, code, message, path)
}

fn categorize(
    status: StatusCode,
    retry_after: Option<Duration>,
    code: String,
    message: String,
    path: &str,
) -> AlpacaError {
    let insufficient = message.to_lowercase().contains("insufficient");
    match status {
        StatusCode::TOO_MANY_REQUESTS => AlpacaError::RateLimited { retry_after },
        s if is_retryable_status(s.as_u16()) => AlpacaError::Server {
            status: s.as_u16(),
            message,
        },
        StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY if insufficient => {
            AlpacaError::InsufficientFunds(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AlpacaError::AuthenticationFailed(message),
        StatusCode::NOT_FOUND => AlpacaError::NotFound(path.to_string()),
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            AlpacaError::OrderRejected(message)
        }
        _ => AlpacaError::Api { code, message },
    }
}
