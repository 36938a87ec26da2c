//! In-memory state backend.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{PersistenceError, StateBackend};
use crate::domain::portfolio::Ledger;

/// In-memory implementation of `StateBackend`.
///
/// Suitable for simulations and tests; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStateBackend {
    ledger: Mutex<Option<Ledger>>,
    fail_writes: Mutex<bool>,
    saves: Mutex<u64>,
}

impl InMemoryStateBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-loaded with `ledger`.
    #[must_use]
    pub fn with_ledger(ledger: Ledger) -> Self {
        let backend = Self::default();
        *backend.ledger.lock() = Some(ledger);
        backend
    }

    /// Make every subsequent save fail until cleared.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Last saved ledger.
    #[must_use]
    pub fn stored(&self) -> Option<Ledger> {
        self.ledger.lock().clone()
    }

    /// Successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

#[async_trait]
impl StateBackend for InMemoryStateBackend {
    async fn load(&self) -> Result<Option<Ledger>, PersistenceError> {
        Ok(self.ledger.lock().clone())
    }

    async fn save(&self, ledger: &Ledger) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock() {
            return Err(PersistenceError::Unavailable(
                "writes disabled".to_string(),
            ));
        }
        *self.ledger.lock() = Some(ledger.clone());
        *self.saves.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
