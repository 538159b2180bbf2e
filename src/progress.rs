//! Progress series
//!
//! Charts the most recent screenings of a patient and attaches the attention
//! trend computed over the same window.

use crate::history::PatientHistory;
use crate::trend::{AttentionSample, TrendAnalyzer};
use crate::types::{Screening, TrendSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of screenings shown in a progress report
pub const DEFAULT_PROGRESS_POINTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub max_points: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_PROGRESS_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub timestamp: DateTime<Utc>,
    pub risk_score: u8,
    pub attention: f64,
    pub motor: f64,
}

impl From<&Screening> for ProgressPoint {
    fn from(screening: &Screening) -> Self {
        Self {
            timestamp: screening.timestamp,
            risk_score: screening.overall_score,
            attention: screening.attention_metric,
            motor: screening.motor_metric,
        }
    }
}

impl AttentionSample for ProgressPoint {
    fn attention_metric(&self) -> f64 {
        self.attention
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Oldest-first
    pub points: Vec<ProgressPoint>,
    pub trends: TrendSignal,
}

/// Build a progress report over the latest `config.max_points` screenings
pub fn progress_report(
    history: &PatientHistory,
    config: &ProgressConfig,
    analyzer: &TrendAnalyzer,
) -> ProgressReport {
    let points: Vec<ProgressPoint> = history
        .tail(config.max_points)
        .iter()
        .map(ProgressPoint::from)
        .collect();
    let trends = analyzer.analyze_trend(&points);
    ProgressReport { points, trends }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttentionTrend, RiskLevel};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn history_with(attention: &[f64]) -> PatientHistory {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap();
        let screenings = attention
            .iter()
            .enumerate()
            .map(|(i, &a)| Screening {
                id: Uuid::new_v4(),
                patient_id: "p1".to_string(),
                timestamp: start + Duration::days(i as i64),
                vision_score: 20.0,
                vision_probability: Some(0.2),
                eeg_score: 30.0,
                attention_metric: a,
                motor_metric: 5.0,
                overall_score: 25,
                risk_level: RiskLevel::Low,
                notes: String::new(),
            })
            .collect();
        PatientHistory::from_screenings("p1", screenings).unwrap()
    }

    #[test]
    fn test_points_are_capped_and_ordered() {
        let attention: Vec<f64> = (0..25).map(|i| 50.0 + i as f64).collect();
        let history = history_with(&attention);
        let report = progress_report(&history, &ProgressConfig::default(), &TrendAnalyzer::new());

        assert_eq!(report.points.len(), 20);
        assert_eq!(report.points[0].attention, 55.0);
        assert_eq!(report.points[19].attention, 74.0);
        assert!(report.points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_report_carries_trend() {
        let history = history_with(&[70.0, 72.0, 68.0, 40.0]);
        let report = progress_report(&history, &ProgressConfig::default(), &TrendAnalyzer::new());
        assert_eq!(report.trends.attention_trend, AttentionTrend::Declining);
        assert!(report.trends.regression_warning.is_some());
    }

    #[test]
    fn test_empty_history() {
        let history = PatientHistory::new("p1");
        let report = progress_report(&history, &ProgressConfig::default(), &TrendAnalyzer::new());
        assert!(report.points.is_empty());
        assert_eq!(report.trends, TrendSignal::stable());
    }

    #[test]
    fn test_wire_field_names() {
        let history = history_with(&[60.0]);
        let report = progress_report(&history, &ProgressConfig::default(), &TrendAnalyzer::new());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["points"][0]["riskScore"], 25);
        assert_eq!(value["trends"]["attentionTrend"], "Stable");
        assert!(value["trends"]["regressionWarning"].is_null());
    }
}
