//! Recommendations read from a JSON file.
//!
//! The file holds either a bare array of recommendations or an object with a
//! `recommendations` array. `{date}` in the configured path is replaced with
//! the trading day (`YYYY-MM-DD`). Each entry is validated on its own; bad
//! entries are reported and skipped, never sized.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::application::ports::{DecisionBatch, DecisionSourceError, DecisionSourcePort};
use crate::domain::recommendation::{Recommendation, RecommendationInput};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileLayout {
    Bare(Vec<serde_json::Value>),
    Wrapped {
        recommendations: Vec<serde_json::Value>,
    },
}

/// Decision source backed by a JSON file per day (or one shared file).
#[derive(Debug, Clone)]
pub struct JsonFileDecisionSource {
    path_template: String,
}

impl JsonFileDecisionSource {
    /// Source reading `path_template`.
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    /// File consulted for `trading_day`.
    #[must_use]
    pub fn path_for(&self, trading_day: NaiveDate) -> PathBuf {
        PathBuf::from(
            self.path_template
                .replace("{date}", &trading_day.format("%Y-%m-%d").to_string()),
        )
    }

    /// Parse a document; each entry is validated independently.
    pub fn parse(json: &str) -> Result<DecisionBatch, DecisionSourceError> {
        let layout: FileLayout =
            serde_json::from_str(json).map_err(|e| DecisionSourceError::Malformed(e.to_string()))?;
        let entries = match layout {
            FileLayout::Bare(entries) | FileLayout::Wrapped {
                recommendations: entries,
            } => entries,
        };

        let mut batch = DecisionBatch::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RecommendationInput>(entry)
                .map_err(|e| e.to_string())
                .and_then(|input| Recommendation::try_from(input).map_err(|e| e.to_string()));
            match parsed {
                Ok(rec) => batch.recommendations.push(rec),
                Err(message) => batch.invalid.push(format!("entry {index}: {message}")),
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl DecisionSourcePort for JsonFileDecisionSource {
    async fn fetch(&self, trading_day: NaiveDate) -> Result<DecisionBatch, DecisionSourceError> {
        let path = self.path_for(trading_day);
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DecisionSourceError::Unavailable(format!("{}: {e}", path.display())))?;
        let batch = Self::parse(&json)?;
        tracing::info!(
            path = %path.display(),
            valid = batch.recommendations.len(),
            invalid = batch.invalid.len(),
            "Loaded recommendations"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::recommendation::Action;

    #[test]
    fn bad_entries_are_isolated() {
        let json = r#"[
            {"instrument_id": "005930", "action": "buy", "confidence": "0.3", "proposed_price": "70000"},
            {"instrument_id": "000660", "action": "buy", "confidence": "1.7", "proposed_price": "120000"},
            {"instrument_id": "", "action": "sell", "confidence": "1", "proposed_price": "1"},
            {"instrument_id": "035420", "action": "sideways", "confidence": "0.5", "proposed_price": "1"}
        ]"#;
        let batch = JsonFileDecisionSource::parse(json).unwrap();

        assert_eq!(batch.recommendations.len(), 1);
        assert_eq!(batch.recommendations[0].confidence(), dec!(0.3));
        assert_eq!(batch.invalid.len(), 3);
        assert!(batch.invalid[0].starts_with("entry 1"));
    }

    #[test]
    fn wrapped_layout() {
        let json = r#"{"trading_day": "2026-03-03", "recommendations": [
            {"instrument_id": "aapl", "action": "sell", "confidence": 1, "proposed_price": 185.5}
        ]}"#;
        let batch = JsonFileDecisionSource::parse(json).unwrap();
        assert_eq!(batch.recommendations[0].action(), Action::Sell);
        assert_eq!(batch.recommendations[0].instrument_id().as_str(), "AAPL");
    }

    #[test]
    fn not_json_is_malformed() {
        assert!(matches!(
            JsonFileDecisionSource::parse("buy everything"),
            Err(DecisionSourceError::Malformed(_))
        ));
    }

    #[test]
    fn date_placeholder() {
        let source = JsonFileDecisionSource::new("recs/{date}.json");
        let day = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        assert_eq!(source.path_for(day), PathBuf::from("recs/2026-03-03.json"));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileDecisionSource::new(dir.path().join("none.json").display().to_string());
        let err = source
            .fetch(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DecisionSourceError::Unavailable(_)));
    }
}
