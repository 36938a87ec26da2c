//! Alpaca-specific error types.

use std::time::Duration;

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the Alpaca adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlpacaError {
    /// Request could not be sent or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited {
        /// Suggested retry delay.
        retry_after: Option<Duration>,
    },

    /// 5xx or 408.
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Not enough buying power.
    #[error("Insufficient buying power: {0}")]
    InsufficientFunds(String),

    /// Order was rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// API returned an error.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from the API.
        code: String,
        /// Error message from the API.
        message: String,
    },
}

impl From<AlpacaError> for BrokerError {
    fn from(err: AlpacaError) -> Self {
        match err {
            AlpacaError::Network(message) => Self::Transport { message },
            AlpacaError::Timeout => Self::Timeout,
            AlpacaError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            AlpacaError::Server { status, message } => Self::Unavailable { status, message },
            AlpacaError::AuthenticationFailed(message) => Self::Authentication { message },
            AlpacaError::InsufficientFunds(message) => Self::InsufficientFunds { message },
            AlpacaError::OrderRejected(reason) => Self::Rejected { reason },
            AlpacaError::NotFound(order_id) => Self::OrderNotFound { order_id },
            AlpacaError::JsonParse(message) => Self::Protocol { message },
            AlpacaError::Api { code, message } => Self::Rejected {
                reason: format!("{code}: {message}"),
            },
        }
    }
}

impl From<reqwest::Error> for AlpacaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::JsonParse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(AlpacaError::Network("reset".into()), true ; "network")]
    #[test_case(AlpacaError::Timeout, true ; "timeout")]
    #[test_case(AlpacaError::RateLimited { retry_after: None }, true ; "rate limited")]
    #[test_case(AlpacaError::Server { status: 503, message: String::new() }, true ; "server")]
    #[test_case(AlpacaError::AuthenticationFailed("bad key".into()), false ; "auth")]
    #[test_case(AlpacaError::InsufficientFunds("bp".into()), false ; "funds")]
    #[test_case(AlpacaError::OrderRejected("halted".into()), false ; "rejected")]
    #[test_case(AlpacaError::JsonParse("eof".into()), false ; "json")]
    fn transient_classification_survives_mapping(err: AlpacaError, transient: bool) {
        assert_eq!(BrokerError::from(err).is_transient(), transient);
    }
}
