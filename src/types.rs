//! Core types for the NeuroBridge risk engine
//!
//! This module defines the value contracts that flow between the analyzers:
//! decoded heatmap pixels, per-frame landmarks, per-session metrics, fused risk
//! results, trend signals and the persisted screening record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest overall score that still maps to the Low tier
pub const LOW_RISK_MAX_SCORE: u8 = 40;

/// Highest overall score that still maps to the Medium tier
pub const MEDIUM_RISK_MAX_SCORE: u8 = 70;

/// Decoded RGB8 image, row-major, three bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Buffer of the given size with every pixel set to `rgb`
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(width, height, data)
    }

    /// `width * height`, `None` if it does not fit in `usize`
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Expected byte length, `None` if it does not fit in `usize`
    pub fn byte_len(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(3)
    }

    /// Whether the byte length matches `width * height * 3`
    pub fn is_well_formed(&self) -> bool {
        self.byte_len() == Some(self.data.len())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(px) = self.data.get_mut(idx..idx + 3) {
            px.copy_from_slice(&rgb);
        }
    }
}

/// Normalized 2-D landmark position in `[0,1] x [0,1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One classified frame from a live session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub landmark: Landmark,
    pub centered: bool,
}

/// Wire form of a captured frame: optional capture offset and the tracked
/// landmark, `null` when no face was detected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_ms: Option<u64>,
    #[serde(default)]
    pub landmark: Option<Landmark>,
}

/// Scalar metrics produced at the end of a live session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    /// Mean per-frame centered score (0-100)
    pub attention_metric: f64,
    /// Scaled horizontal variance of the tracked landmark (0-100)
    pub motor_metric: f64,
    /// Frames with a detected face
    #[serde(default)]
    pub frames_sampled: u64,
    /// Frames without a detected face
    #[serde(default)]
    pub frames_skipped: u64,
}

/// How a vision assessment was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionStatus {
    /// Hot pixels were found and their dispersion measured
    Analyzed,
    /// No hot pixels in the image
    NoGazeData,
    /// The pixel data could not be read
    InferenceFailed,
}

/// Output of the heatmap gaze analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionAssessment {
    /// Risk of scattered attention (0-1, two decimals)
    pub vision_probability: f64,
    /// Confidence in the probability (0-1, two decimals)
    pub confidence: f64,
    pub explanation: String,
    pub status: VisionStatus,
}

/// Coarse risk tier derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map an overall score to its tier. This is the only tiering rule.
    pub fn from_score(score: u8) -> Self {
        if score <= LOW_RISK_MAX_SCORE {
            RiskLevel::Low
        } else if score <= MEDIUM_RISK_MAX_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// Direction of attention relative to recent sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttentionTrend {
    #[serde(rename = "declining")]
    Declining,
    #[serde(rename = "Stable")]
    Stable,
    #[serde(rename = "improving")]
    Improving,
}

impl AttentionTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionTrend::Declining => "declining",
            AttentionTrend::Stable => "Stable",
            AttentionTrend::Improving => "improving",
        }
    }
}

/// Per-signal risk contributions (each 0-100) before weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub vision: f64,
    pub attention: f64,
    pub motor: f64,
}

/// Fused risk for one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionResult {
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<RiskBreakdown>,
}

/// Regression / improvement signal for the latest session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSignal {
    pub regression_warning: Option<String>,
    pub attention_trend: AttentionTrend,
}

impl TrendSignal {
    pub fn stable() -> Self {
        Self {
            regression_warning: None,
            attention_trend: AttentionTrend::Stable,
        }
    }
}

/// Persisted result of one screening session, never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screening {
    pub id: Uuid,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    /// Normalized vision risk (0-100)
    pub vision_score: f64,
    /// Heatmap probability (0-1); `None` for legacy records
    #[serde(default)]
    pub vision_probability: Option<f64>,
    /// Secondary signal (0-100)
    pub eeg_score: f64,
    pub attention_metric: f64,
    pub motor_metric: f64,
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub notes: String,
}

impl Screening {
    /// Whether the stored tier agrees with the stored score
    pub fn is_consistent(&self) -> bool {
        self.risk_level == RiskLevel::from_score(self.overall_score)
    }

    /// Vision contribution for fusion; legacy records contribute nothing
    pub fn vision_probability_or_zero(&self) -> f64 {
        self.vision_probability.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(41), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(71), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_every_score_has_exactly_one_tier() {
        let mut previous = RiskLevel::Low;
        for score in 0..=100u8 {
            let level = RiskLevel::from_score(score);
            // Tiers never step backwards as the score grows
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"Medium\"");
        assert_eq!(
            serde_json::to_string(&AttentionTrend::Declining).unwrap(),
            "\"declining\""
        );
        assert_eq!(
            serde_json::to_string(&AttentionTrend::Stable).unwrap(),
            "\"Stable\""
        );
        assert_eq!(AttentionTrend::Improving.as_str(), "improving");
    }

    #[test]
    fn test_pixel_buffer_access() {
        let mut buffer = PixelBuffer::filled(4, 3, [0, 0, 255]);
        assert!(buffer.is_well_formed());
        assert_eq!(buffer.pixel_count(), Some(12));
        assert_eq!(buffer.byte_len(), Some(36));

        buffer.set_pixel(2, 1, [255, 0, 0]);
        assert_eq!(buffer.pixel(2, 1), Some([255, 0, 0]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 255]));
        assert_eq!(buffer.pixel(4, 0), None);

        let truncated = PixelBuffer::new(4, 3, vec![0; 10]);
        assert!(!truncated.is_well_formed());

        // Declared size too large to address is malformed, not a panic
        let huge = PixelBuffer::new(u32::MAX, u32::MAX, vec![255; 12]);
        assert_eq!(huge.byte_len(), None);
        assert!(!huge.is_well_formed());
    }

    #[test]
    fn test_frame_record_null_landmark() {
        let record: FrameRecord = serde_json::from_str(r#"{"tMs": 120, "landmark": null}"#).unwrap();
        assert_eq!(record.t_ms, Some(120));
        assert!(record.landmark.is_none());

        let record: FrameRecord =
            serde_json::from_str(r#"{"landmark": {"x": 0.5, "y": 0.4}}"#).unwrap();
        assert_eq!(record.landmark, Some(Landmark::new(0.5, 0.4)));
    }

    #[test]
    fn test_legacy_screening_vision_defaults_to_zero() {
        let json = r#"{
            "id": "7f1c7c1e-2f4a-4c4e-9d3b-0b5f4b7a9a11",
            "patientId": "patient-1",
            "timestamp": "2024-03-01T10:00:00Z",
            "visionScore": 62.0,
            "eegScore": 40.0,
            "attentionMetric": 62.0,
            "motorMetric": 12.0,
            "overallScore": 53,
            "riskLevel": "Medium"
        }"#;
        let screening: Screening = serde_json::from_str(json).unwrap();
        assert_eq!(screening.vision_probability, None);
        assert_eq!(screening.vision_probability_or_zero(), 0.0);
        assert!(screening.is_consistent());
        assert_eq!(screening.notes, "");
    }
}
