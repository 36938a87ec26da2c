//! Reconciliation configuration for periodic broker state sync.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Run the periodic sweep. The startup pass always runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Sweep interval in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Sync cash and holdings from the broker balance.
    #[serde(default = "default_enabled")]
    pub sync_balance: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            sync_balance: default_enabled(),
        }
    }
}

impl ReconciliationConfig {
    /// Sweep interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    300
}
