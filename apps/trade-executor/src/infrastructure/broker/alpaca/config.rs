//! Alpaca adapter configuration.

use std::time::Duration;

use crate::domain::shared::TradingMode;

/// Alpaca account environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpacaEnvironment {
    /// Paper trading.
    Paper,
    /// Live trading (real money).
    Live,
}

impl AlpacaEnvironment {
    /// Environment for a trading mode; `None` for the simulator.
    #[must_use]
    pub const fn for_mode(mode: TradingMode) -> Option<Self> {
        match mode {
            TradingMode::Live => Some(Self::Live),
            TradingMode::Paper => Some(Self::Paper),
            TradingMode::Simulated => None,
        }
    }

    /// Default trading API base URL.
    #[must_use]
    pub const fn trading_base_url(&self) -> &'static str {
        match self {
            Self::Paper => "https://paper-api.alpaca.markets",
            Self::Live => "https://api.alpaca.markets",
        }
    }

    /// Default market data API base URL.
    #[must_use]
    pub const fn data_base_url(&self) -> &'static str {
        "https://data.alpaca.markets"
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for AlpacaEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Configuration for the Alpaca broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// API key.
    pub api_key: String,
    /// API secret.
    pub api_secret: String,
    /// Account environment.
    pub environment: AlpacaEnvironment,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Trading API override.
    pub trading_base_url: Option<String>,
    /// Data API override.
    pub data_base_url: Option<String>,
}

impl AlpacaConfig {
    /// Create a new configuration.
    #[must_use]
    pub const fn new(api_key: String, api_secret: String, environment: AlpacaEnvironment) -> Self {
        Self {
            api_key,
            api_secret,
            environment,
            timeout: Duration::from_secs(10),
            trading_base_url: None,
            data_base_url: None,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point both APIs at `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.trading_base_url = Some(base_url.clone());
        self.data_base_url = Some(base_url);
        self
    }

    /// Trading API base URL in effect.
    #[must_use]
    pub fn trading_base_url(&self) -> &str {
        self.trading_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.trading_base_url())
    }

    /// Data API base URL in effect.
    #[must_use]
    pub fn data_base_url(&self) -> &str {
        self.data_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.data_base_url())
    }
}
