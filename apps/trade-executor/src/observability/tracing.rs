//! Structured logging setup.
//!
//! `RUST_LOG` overrides the configured level when set.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable, for terminals.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error type for tracing setup.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Unsupported output format.
    #[error("unknown log format '{0}'")]
    UnknownFormat(String),
    /// Level directive did not parse.
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),
    /// A global subscriber is already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Install the global subscriber.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|_| TracingError::InvalidLevel(level.to_string()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| TracingError::SubscriberError(e.to_string()))?;

    tracing::info!(level, format = ?format, "Tracing initialized");
    Ok(())
}
