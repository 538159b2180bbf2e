//! Engine configuration
//!
//! Groups every tunable threshold. Defaults reproduce the shipped constants;
//! a JSON document only needs to name the fields it overrides.

use crate::collector::CollectorConfig;
use crate::error::EngineError;
use crate::fusion::FusionConfig;
use crate::heatmap::HeatmapConfig;
use crate::progress::ProgressConfig;
use crate::therapy::TherapyConfig;
use crate::trend::TrendConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub heatmap: HeatmapConfig,
    pub collector: CollectorConfig,
    pub fusion: FusionConfig,
    pub trend: TrendConfig,
    pub therapy: TherapyConfig,
    pub progress: ProgressConfig,
}

impl EngineConfig {
    /// Parse and validate a (possibly partial) JSON config
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that would break the score or trend contracts
    pub fn validate(&self) -> Result<(), EngineError> {
        self.fusion.validate()?;

        if self.heatmap.sensitivity <= 0.0 {
            return Err(EngineError::ConfigError(
                "heatmap sensitivity must be positive".to_string(),
            ));
        }

        if self.heatmap.confidence_floor > self.heatmap.confidence_ceiling {
            return Err(EngineError::ConfigError(
                "heatmap confidence floor exceeds ceiling".to_string(),
            ));
        }

        if self.trend.baseline_window == 0 || self.trend.min_history < 2 {
            return Err(EngineError::ConfigError(
                "trend needs a baseline window and at least two screenings".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json(r#"{"trend": {"regression_drop": 20.0}, "heatmap": {"hot_red_min": 140}}"#)
                .unwrap();
        assert_eq!(config.trend.regression_drop, 20.0);
        assert_eq!(config.trend.baseline_window, 3);
        assert_eq!(config.heatmap.hot_red_min, 140);
        assert_eq!(config.heatmap.hot_blue_max, 100);
        assert_eq!(config.fusion, FusionConfig::default());
    }

    #[test]
    fn test_rejects_unbalanced_weights() {
        let err = EngineConfig::from_json(r#"{"fusion": {"ensemble": {"vision": 0.9}}}"#).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let err = EngineConfig::from_json(
            r#"{"fusion": {"legacy": {"vision": 1.2, "eeg": -0.2}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_empty_baseline_window() {
        let err = EngineConfig::from_json(r#"{"trend": {"baseline_window": 0}}"#).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
