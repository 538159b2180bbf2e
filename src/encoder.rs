//! Session report encoder
//!
//! Turns a recorded screening (plus the vision assessment and trend that
//! accompanied it) into the session output contract handed to callers.

use crate::error::EngineError;
use crate::types::{RiskBreakdown, RiskLevel, Screening, TrendSignal, VisionAssessment};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current session report schema version
pub const REPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Session output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub screening_id: Uuid,
    pub patient_id: String,
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<RiskBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSignal>,
}

/// Session report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        screening: &Screening,
        vision: Option<&VisionAssessment>,
        breakdown: Option<RiskBreakdown>,
        trends: Option<TrendSignal>,
    ) -> SessionReport {
        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            screening_id: screening.id,
            patient_id: screening.patient_id.clone(),
            overall_score: screening.overall_score,
            risk_level: screening.risk_level,
            vision_probability: screening.vision_probability,
            confidence: vision.map(|v| v.confidence),
            explanation: vision.map(|v| v.explanation.clone()),
            breakdown,
            trends,
        }
    }

    pub fn encode_to_json(
        &self,
        screening: &Screening,
        vision: Option<&VisionAssessment>,
        breakdown: Option<RiskBreakdown>,
        trends: Option<TrendSignal>,
    ) -> Result<String, EngineError> {
        let report = self.encode(screening, vision, breakdown, trends);
        serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttentionTrend, VisionStatus};
    use chrono::TimeZone;

    fn make_screening(vision_probability: Option<f64>) -> Screening {
        Screening {
            id: Uuid::new_v4(),
            patient_id: "patient-9".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap(),
            vision_score: 80.0,
            vision_probability,
            eeg_score: 50.0,
            attention_metric: 30.0,
            motor_metric: 90.0,
            overall_score: 79,
            risk_level: RiskLevel::High,
            notes: String::new(),
        }
    }

    #[test]
    fn test_encode_ensemble_report() {
        let encoder = ReportEncoder::with_instance_id("instance-1".to_string());
        let vision = VisionAssessment {
            vision_probability: 0.8,
            confidence: 0.72,
            explanation: "Irregular gaze distribution detected (Scattered Focus).".to_string(),
            status: VisionStatus::Analyzed,
        };
        let breakdown = RiskBreakdown {
            vision: 80.0,
            attention: 70.0,
            motor: 90.0,
        };

        let json = encoder
            .encode_to_json(&make_screening(Some(0.8)), Some(&vision), Some(breakdown), None)
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["reportVersion"], "1.0.0");
        assert_eq!(payload["producer"]["name"], "neurobridge-risk");
        assert_eq!(payload["producer"]["instanceId"], "instance-1");
        assert_eq!(payload["overallScore"], 79);
        assert_eq!(payload["riskLevel"], "High");
        assert_eq!(payload["visionProbability"], 0.8);
        assert_eq!(payload["confidence"], 0.72);
        assert_eq!(payload["breakdown"]["attention"], 70.0);
        assert!(payload.get("trends").is_none());
    }

    #[test]
    fn test_legacy_report_omits_vision_fields() {
        let encoder = ReportEncoder::new();
        let trends = TrendSignal {
            regression_warning: None,
            attention_trend: AttentionTrend::Improving,
        };
        let report = encoder.encode(&make_screening(None), None, None, Some(trends));
        let payload = serde_json::to_value(&report).unwrap();

        assert!(payload.get("visionProbability").is_none());
        assert!(payload.get("confidence").is_none());
        assert!(payload.get("breakdown").is_none());
        assert_eq!(payload["trends"]["attentionTrend"], "improving");
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = ReportEncoder::new().encode(&make_screening(None), None, None, None);
        let b = ReportEncoder::new().encode(&make_screening(None), None, None, None);
        assert_ne!(a.producer.instance_id, b.producer.instance_id);
    }
}
