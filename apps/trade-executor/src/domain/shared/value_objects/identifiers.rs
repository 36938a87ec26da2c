//! Identifier newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Exchange instrument identifier (ticker or numeric stock code).
///
/// Normalized to trimmed uppercase so `"aapl "` and `"AAPL"` are one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Create an instrument id, rejecting blank or oversized input.
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = value.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::invalid("instrument_id", "must not be empty"));
        }
        if normalized.len() > 32 {
            return Err(DomainError::invalid(
                "instrument_id",
                "must be at most 32 characters",
            ));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(DomainError::invalid(
                "instrument_id",
                format!("contains unsupported characters: {normalized}"),
            ));
        }
        Ok(Self(normalized))
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order id assigned by the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerOrderId(String);

impl BrokerOrderId {
    /// Wrap a broker-assigned id.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrokerOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
