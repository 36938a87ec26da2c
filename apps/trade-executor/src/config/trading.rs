//! Exchange, monitor and schedule configuration.

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::application::services::{PositionMonitorConfig, ScheduleConfig};
use crate::domain::shared::TradingCalendar;

use super::ConfigError;

/// Exchange the account trades on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// UTC offset in hours; the trading day is the local date.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl ExchangeConfig {
    /// Calendar for this exchange.
    #[must_use]
    pub fn calendar(&self) -> TradingCalendar {
        TradingCalendar::from_utc_offset_hours(self.utc_offset_hours)
    }
}

/// Position monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Run the monitor.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl MonitorConfig {
    /// Convert to the monitor's settings.
    #[must_use]
    pub const fn to_monitor_config(&self) -> PositionMonitorConfig {
        PositionMonitorConfig {
            enabled: self.enabled,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}

/// Daily routine settings. Times are exchange-local `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Run the routine.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When to place the day's orders.
    #[serde(default = "default_order_time")]
    pub order_time: String,
    /// When scalping positions are liquidated.
    #[serde(default = "default_liquidation_time")]
    pub liquidation_time: String,
    /// Recommendation file; `{date}` is replaced by the trading day.
    #[serde(default = "default_recommendation_file")]
    pub recommendation_file: String,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            order_time: default_order_time(),
            liquidation_time: default_liquidation_time(),
            recommendation_file: default_recommendation_file(),
        }
    }
}

impl ScheduleSettings {
    /// Parse into the routine's settings.
    pub fn to_schedule(&self) -> Result<ScheduleConfig, ConfigError> {
        Ok(ScheduleConfig {
            enabled: self.enabled,
            order_time: parse_local_time("schedule.order_time", &self.order_time)?,
            liquidation_time: parse_local_time(
                "schedule.liquidation_time",
                &self.liquidation_time,
            )?,
        })
    }
}

fn parse_local_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ConfigError::ValidationError(format!("{field} must be HH:MM, got '{value}'")))
}

const fn default_true() -> bool {
    true
}

const fn default_utc_offset_hours() -> i32 {
    9
}

const fn default_poll_interval_secs() -> u64 {
    60
}

fn default_order_time() -> String {
    "09:05".to_string()
}

fn default_liquidation_time() -> String {
    "15:10".to_string()
}

fn default_recommendation_file() -> String {
    "./data/recommendations/{date}.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_times_parse_with_or_without_seconds() {
        let settings = ScheduleSettings {
            order_time: "09:30".into(),
            liquidation_time: "15:20:30".into(),
            ..ScheduleSettings::default()
        };
        let schedule = settings.to_schedule().unwrap();
        assert_eq!(schedule.order_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(
            schedule.liquidation_time,
            NaiveTime::from_hms_opt(15, 20, 30).unwrap()
        );
    }

    #[test]
    fn bad_time_names_the_field() {
        let settings = ScheduleSettings {
            order_time: "9am".into(),
            ..ScheduleSettings::default()
        };
        let err = settings.to_schedule().unwrap_err();
        assert!(err.to_string().contains("schedule.order_time"));
    }
}
