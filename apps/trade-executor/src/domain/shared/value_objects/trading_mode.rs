//! Brokerage account mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Which account the process trades against.
///
/// Fixed for the life of the process and recorded in the persisted state so a
/// portfolio is never shared between real and paper money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Real brokerage account.
    Live,
    /// Brokerage-hosted paper account.
    Paper,
    /// In-process simulated broker.
    Simulated,
}

impl TradingMode {
    /// Lowercase name used in config and state files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Paper => "paper",
            Self::Simulated => "simulated",
        }
    }

    /// Whether real money moves in this mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradingMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "real" => Ok(Self::Live),
            "paper" => Ok(Self::Paper),
            "simulated" | "sim" => Ok(Self::Simulated),
            _ => Err(DomainError::Parse {
                type_name: "TradingMode",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("REAL".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert_eq!("paper".parse::<TradingMode>().unwrap(), TradingMode::Paper);
        assert_eq!("sim".parse::<TradingMode>().unwrap(), TradingMode::Simulated);
        assert!("demo".parse::<TradingMode>().is_err());
    }

    #[test]
    fn only_live_is_live() {
        assert!(TradingMode::Live.is_live());
        assert!(!TradingMode::Paper.is_live());
        assert!(!TradingMode::Simulated.is_live());
    }
}
