//! Configuration module for the trade executor.
//!
//! Loads a single YAML file with environment variable interpolation and
//! validates it before anything touches the broker.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trade_executor::config::load_config;
//!
//! // Path from TRADER_CONFIG, falling back to config.yaml
//! let config = load_config(None)?;
//! println!("mode: {}", config.mode);
//! ```

mod brokers;
mod notifier;
mod observability;
mod persistence;
mod reconciliation;
mod server;
mod trading;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::risk_management::RiskConfig;
use crate::domain::shared::TradingMode;
use crate::domain::sizing::Strategy;

pub use brokers::{
    AlpacaAccounts, AlpacaCredentials, BrokersConfig, FillPollConfig, RetryConfig,
    SimulatedConfig,
};
pub use notifier::NotifierConfig;
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use persistence::PersistenceConfig;
pub use reconciliation::ReconciliationConfig;
pub use server::ServerConfig;
pub use trading::{ExchangeConfig, MonitorConfig, ScheduleSettings};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRADER_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required credential.
    #[error("Missing required credential: {0}")]
    MissingCredential(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account the process trades against.
    #[serde(default = "default_mode")]
    pub mode: TradingMode,
    /// Exchange calendar.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Hard risk limits.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Trading style.
    #[serde(default)]
    pub strategy: Strategy,
    /// Broker configuration.
    #[serde(default)]
    pub brokers: BrokersConfig,
    /// State file.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Position monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Daily routine.
    #[serde(default)]
    pub schedule: ScheduleSettings,
    /// Broker reconciliation.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// HTTP command surface.
    #[serde(default)]
    pub server: ServerConfig,
    /// Notifications.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

const fn default_mode() -> TradingMode {
    TradingMode::Paper
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// Without an explicit `path`, `TRADER_CONFIG` is consulted and then
/// `config.yaml`.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(
        || std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string()),
        str::to_string,
    );

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let risk = &config.risk;
    risk.validate()
        .map_err(|e| ConfigError::ValidationError(format!("risk: {e}")))?;

    if risk.default_order_amount < risk.min_order_amount
        || risk.default_order_amount > risk.max_order_amount
    {
        return Err(ConfigError::ValidationError(
            "risk.default_order_amount must lie between min_order_amount and max_order_amount"
                .to_string(),
        ));
    }

    if risk.max_buys_per_day == 0 {
        return Err(ConfigError::ValidationError(
            "risk.max_buys_per_day must be at least 1".to_string(),
        ));
    }

    if !(-14..=14).contains(&config.exchange.utc_offset_hours) {
        return Err(ConfigError::ValidationError(
            "exchange.utc_offset_hours must be between -14 and 14".to_string(),
        ));
    }

    let credentials = match config.mode {
        TradingMode::Live => Some(("brokers.alpaca.live", &config.brokers.alpaca.live)),
        TradingMode::Paper => Some(("brokers.alpaca.paper", &config.brokers.alpaca.paper)),
        TradingMode::Simulated => None,
    };
    if let Some((section, credentials)) = credentials
        && !credentials.is_complete()
    {
        return Err(ConfigError::MissingCredential(format!(
            "{section}.api_key and {section}.api_secret are required in {} mode",
            config.mode
        )));
    }

    if config.brokers.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "brokers.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.monitor.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.poll_interval_secs must be positive".to_string(),
        ));
    }

    if config.reconciliation.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "reconciliation.interval_secs must be positive".to_string(),
        ));
    }

    config.schedule.to_schedule()?;

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}
