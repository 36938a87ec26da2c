//! Engine-level errors and their HTTP mapping.
//!
//! Risk gate refusals are not errors; they travel as
//! [`SubmissionOutcome`](crate::application::services::SubmissionOutcome)
//! values. `EngineError` covers faults.
//!
//! | Code | HTTP | Usage |
//! |------|------|-------|
//! | `INVALID_REQUEST` | 400 | Malformed recommendation or command |
//! | `STATE_CONFLICT` | 409 | Ledger state machine refused a transition |
//! | `BROKER_UNAVAILABLE` | 502 | Broker read failed |
//! | `PERSISTENCE_UNAVAILABLE` | 503 | State store unreadable/unwritable |
//! | `DECISION_SOURCE_UNAVAILABLE` | 502 | Recommendations could not be read |
//! | `INTERNAL` | 500 | Background task failure |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{BrokerError, DecisionSourceError, PersistenceError};
use crate::application::services::StoreError;
use crate::domain::portfolio::LedgerError;
use crate::domain::shared::DomainError;

/// Error codes exposed on the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input.
    InvalidRequest,
    /// Ledger refused a transition.
    StateConflict,
    /// Broker call failed.
    BrokerUnavailable,
    /// State store unavailable. Trading is stopped.
    PersistenceUnavailable,
    /// Decision source unreadable.
    DecisionSourceUnavailable,
    /// Unexpected failure.
    Internal,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::StateConflict => 409,
            Self::BrokerUnavailable | Self::DecisionSourceUnavailable => 502,
            Self::PersistenceUnavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Stable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::StateConflict => "STATE_CONFLICT",
            Self::BrokerUnavailable => "BROKER_UNAVAILABLE",
            Self::PersistenceUnavailable => "PERSISTENCE_UNAVAILABLE",
            Self::DecisionSourceUnavailable => "DECISION_SOURCE_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Faults raised by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// State store unavailable; fail closed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Ledger invariant violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Broker read failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Decision source failed.
    #[error(transparent)]
    DecisionSource(#[from] DecisionSourceError),

    /// A spawned execution task died.
    #[error("execution task failed: {0}")]
    Task(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Persistence(e) => Self::Persistence(e),
            StoreError::Ledger(e) => Self::Ledger(e),
        }
    }
}

impl EngineError {
    /// Code for the command surface.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Persistence(_) => ErrorCode::PersistenceUnavailable,
            Self::Ledger(_) => ErrorCode::StateConflict,
            Self::Broker(_) => ErrorCode::BrokerUnavailable,
            Self::Validation(_) => ErrorCode::InvalidRequest,
            Self::DecisionSource(_) => ErrorCode::DecisionSourceUnavailable,
            Self::Task(_) => ErrorCode::Internal,
        }
    }

    /// Whether the fault stops all trading until resolved.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// JSON body for the command surface.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        let mut details = HashMap::new();
        if let Self::Broker(e) = self {
            details.insert("broker_error".to_string(), e.kind().to_string());
        }
        HttpErrorResponse {
            code: self.code().reason().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

/// HTTP error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}
