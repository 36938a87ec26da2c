//! State Backend Port (Driven Port)
//!
//! Durable storage for the ledger. `save` must replace the stored record
//! atomically: after a crash a reader sees either the old or the new ledger,
//! never a torn write.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::portfolio::Ledger;
use crate::domain::shared::TradingMode;

/// State store failures. Trading stops while these persist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Filesystem or device error.
    #[error("state storage I/O error at {path}: {message}")]
    Io {
        /// Location.
        path: String,
        /// OS error text.
        message: String,
    },

    /// Ledger could not be encoded or decoded.
    #[error("state serialization error: {0}")]
    Serialization(String),

    /// Stored ledger belongs to another account mode.
    #[error("state was written in {stored} mode but process runs in {configured} mode")]
    ModeMismatch {
        /// Mode in the stored ledger.
        stored: TradingMode,
        /// Mode of this process.
        configured: TradingMode,
    },

    /// Backend refuses service.
    #[error("state storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable ledger storage.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Stored ledger, or `None` on first start.
    async fn load(&self) -> Result<Option<Ledger>, PersistenceError>;

    /// Atomically replace the stored ledger.
    async fn save(&self, ledger: &Ledger) -> Result<(), PersistenceError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}
