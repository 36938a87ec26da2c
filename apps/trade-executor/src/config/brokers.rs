//! Broker configuration for order routing.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::services::FillPolling;
use crate::broker::BrokerRetryPolicy;
use crate::domain::shared::TradingMode;
use crate::infrastructure::broker::{AlpacaConfig, AlpacaEnvironment};

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokersConfig {
    /// Alpaca credentials per account.
    #[serde(default)]
    pub alpaca: AlpacaAccounts,
    /// In-process simulator.
    #[serde(default)]
    pub simulated: SimulatedConfig,
    /// Submission retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Fill confirmation polling.
    #[serde(default)]
    pub fill_poll: FillPollConfig,
}

impl BrokersConfig {
    /// Alpaca adapter settings for `mode`; `None` for the simulator.
    #[must_use]
    pub fn alpaca_config(&self, mode: TradingMode) -> Option<AlpacaConfig> {
        let environment = AlpacaEnvironment::for_mode(mode)?;
        let credentials = match environment {
            AlpacaEnvironment::Live => &self.alpaca.live,
            AlpacaEnvironment::Paper => &self.alpaca.paper,
        };
        let mut config = AlpacaConfig::new(
            credentials.api_key.clone(),
            credentials.api_secret.clone(),
            environment,
        )
        .with_timeout(Duration::from_secs(credentials.timeout_secs));
        if let Some(url) = &credentials.base_url {
            config = config.with_base_url(url.clone());
        }
        Some(config)
    }
}

/// Live and paper credential sets. Never shared.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlpacaAccounts {
    /// Real-money account.
    #[serde(default)]
    pub live: AlpacaCredentials,
    /// Paper account.
    #[serde(default)]
    pub paper: AlpacaCredentials,
}

/// One Alpaca account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaCredentials {
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret.
    #[serde(default)]
    pub api_secret: String,
    /// Trading API override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AlpacaCredentials {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AlpacaCredentials {
    /// Whether both key and secret are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Simulated broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedConfig {
    /// Starting cash.
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
        }
    }
}

/// Retry policy for order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth factor.
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter fraction.
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_multiplier(),
            jitter_factor: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Convert to the coordinator's policy.
    #[must_use]
    pub const fn to_policy(&self) -> BrokerRetryPolicy {
        BrokerRetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
        }
    }
}

/// Fill confirmation polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillPollConfig {
    /// Delay between status queries in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Queries before leaving the order to reconciliation.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for FillPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl FillPollConfig {
    /// Convert to the coordinator's polling settings.
    #[must_use]
    pub const fn to_polling(&self) -> FillPolling {
        FillPolling {
            interval: Duration::from_millis(self.interval_ms),
            max_polls: self.max_polls,
        }
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_starting_cash() -> Decimal {
    dec!(10000000)
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.2
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_max_polls() -> u32 {
    20
}
