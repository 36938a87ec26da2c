//! Decision Source Port (Driven Port)

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::recommendation::Recommendation;

/// Decision source failures.
#[derive(Debug, Error)]
pub enum DecisionSourceError {
    /// Source could not be read.
    #[error("decision source unavailable: {0}")]
    Unavailable(String),

    /// Source was read but is not in the expected shape.
    #[error("malformed decision source: {0}")]
    Malformed(String),
}

/// Recommendations for one day plus the entries that failed validation.
#[derive(Debug, Clone, Default)]
pub struct DecisionBatch {
    /// Validated recommendations.
    pub recommendations: Vec<Recommendation>,
    /// One message per refused entry.
    pub invalid: Vec<String>,
}

/// Supplier of recommendations for the daily routine.
#[async_trait]
pub trait DecisionSourcePort: Send + Sync {
    /// Recommendations for `trading_day`.
    async fn fetch(&self, trading_day: NaiveDate) -> Result<DecisionBatch, DecisionSourceError>;
}
