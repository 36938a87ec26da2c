//! Notification delivery configuration.

use serde::{Deserialize, Serialize};

/// Notifier configuration. Without a webhook URL, notifications are only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Chat webhook URL.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Delivery timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    5
}
