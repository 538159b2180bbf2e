//! Multi-signal risk fusion
//!
//! Combines per-session signals into one overall score (0-100) and a risk tier.
//! Two input shapes are supported and share one weighted-sum implementation:
//!
//! ```text
//! Ensemble:  0.45 * (100 * vision_probability)
//!          + 0.35 * (100 - attention_metric)
//!          + 0.20 * min(100, motor_metric)
//!
//! Legacy:    0.60 * vision_score + 0.40 * eeg_score
//! ```
//!
//! A missing vision probability contributes zero vision risk. The score is
//! rounded half-up and tiered by [`RiskLevel::from_score`].

use crate::error::EngineError;
use crate::stats::round_score;
use crate::types::{FusionResult, RiskBreakdown, RiskLevel};
use serde::{Deserialize, Serialize};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Inputs for one fusion call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FusionInputs {
    /// Heatmap-era sessions: vision probability, attention and motor metrics
    #[serde(rename_all = "camelCase")]
    Ensemble {
        vision_probability: Option<f64>,
        attention_metric: f64,
        motor_metric: f64,
    },
    /// Records predating the heatmap analyzer: two raw scores
    #[serde(rename_all = "camelCase")]
    Legacy { vision_score: f64, eeg_score: f64 },
}

impl FusionInputs {
    /// Reject non-finite and out-of-range metrics before fusion
    pub fn validate(&self) -> Result<(), EngineError> {
        match *self {
            FusionInputs::Ensemble {
                vision_probability,
                attention_metric,
                motor_metric,
            } => {
                if let Some(p) = vision_probability {
                    check_range("visionProbability", p, 0.0, 1.0, "0-1")?;
                }
                check_range("attentionMetric", attention_metric, 0.0, 100.0, "0-100")?;
                check_range("motorMetric", motor_metric, 0.0, f64::MAX, ">= 0")?;
            }
            FusionInputs::Legacy {
                vision_score,
                eeg_score,
            } => {
                check_range("visionScore", vision_score, 0.0, 100.0, "0-100")?;
                check_range("eegScore", eeg_score, 0.0, 100.0, "0-100")?;
            }
        }
        Ok(())
    }
}

pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> Result<(), EngineError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(EngineError::InvalidMetric {
            name,
            value,
            expected,
        })
    }
}

/// Weights for heatmap-era fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub vision: f64,
    pub attention: f64,
    pub motor: f64,
    /// Motor risk saturates here
    pub motor_cap: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            vision: 0.45,
            attention: 0.35,
            motor: 0.20,
            motor_cap: 100.0,
        }
    }
}

/// Weights for two-signal legacy fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyWeights {
    pub vision: f64,
    pub eeg: f64,
}

impl Default for LegacyWeights {
    fn default() -> Self {
        Self {
            vision: 0.6,
            eeg: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub ensemble: EnsembleWeights,
    pub legacy: LegacyWeights,
}

impl FusionConfig {
    /// Weights must be non-negative and sum to 1 in each mode
    pub fn validate(&self) -> Result<(), EngineError> {
        let e = &self.ensemble;
        let l = &self.legacy;

        if [e.vision, e.attention, e.motor, l.vision, l.eeg]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(EngineError::ConfigError(
                "fusion weights must be finite and non-negative".to_string(),
            ));
        }

        let ensemble_sum = e.vision + e.attention + e.motor;
        if (ensemble_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::ConfigError(format!(
                "ensemble weights sum to {ensemble_sum}, expected 1"
            )));
        }

        let legacy_sum = l.vision + l.eeg;
        if (legacy_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::ConfigError(format!(
                "legacy weights sum to {legacy_sum}, expected 1"
            )));
        }

        if !(e.motor_cap > 0.0 && e.motor_cap <= 100.0) {
            return Err(EngineError::ConfigError(format!(
                "motor cap {} outside 0-100",
                e.motor_cap
            )));
        }

        Ok(())
    }
}

/// One risk contribution and its weight
#[derive(Debug, Clone, Copy)]
struct WeightedSignal {
    weight: f64,
    risk: f64,
}

/// Risk fusion engine
#[derive(Debug, Clone, Default)]
pub struct RiskFusionEngine {
    config: FusionConfig,
}

impl RiskFusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with custom weights, which are used as given
    pub fn with_config(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Engine with custom weights, rejecting weights that break the 0-100 scale
    pub fn try_with_config(config: FusionConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Fuse inputs into an overall score and tier
    ///
    /// Inputs are assumed valid; see [`FusionInputs::validate`].
    pub fn fuse(&self, inputs: &FusionInputs) -> FusionResult {
        let (signals, breakdown) = self.weighted_signals(inputs);
        let weighted: f64 = signals.iter().map(|s| s.weight * s.risk).sum();

        // Valid inputs and weights keep this inside 0-100; the clamp holds the
        // contract for unvalidated configs too
        let overall_score = round_score(weighted).clamp(0.0, 100.0) as u8;
        let risk_level = RiskLevel::from_score(overall_score);

        log::debug!(
            "fused {:?} -> weighted={:.3} score={} level={}",
            inputs,
            weighted,
            overall_score,
            risk_level.as_str()
        );

        FusionResult {
            overall_score,
            risk_level,
            breakdown,
        }
    }

    /// Validate, then fuse
    pub fn fuse_checked(&self, inputs: &FusionInputs) -> Result<FusionResult, EngineError> {
        inputs.validate()?;
        Ok(self.fuse(inputs))
    }

    fn weighted_signals(&self, inputs: &FusionInputs) -> (Vec<WeightedSignal>, Option<RiskBreakdown>) {
        match *inputs {
            FusionInputs::Ensemble {
                vision_probability,
                attention_metric,
                motor_metric,
            } => {
                let w = &self.config.ensemble;
                let breakdown = RiskBreakdown {
                    vision: 100.0 * vision_probability.unwrap_or(0.0),
                    attention: 100.0 - attention_metric,
                    motor: motor_metric.min(w.motor_cap),
                };
                let signals = vec![
                    WeightedSignal {
                        weight: w.vision,
                        risk: breakdown.vision,
                    },
                    WeightedSignal {
                        weight: w.attention,
                        risk: breakdown.attention,
                    },
                    WeightedSignal {
                        weight: w.motor,
                        risk: breakdown.motor,
                    },
                ];
                (signals, Some(breakdown))
            }
            FusionInputs::Legacy {
                vision_score,
                eeg_score,
            } => {
                let w = &self.config.legacy;
                let signals = vec![
                    WeightedSignal {
                        weight: w.vision,
                        risk: vision_score,
                    },
                    WeightedSignal {
                        weight: w.eeg,
                        risk: eeg_score,
                    },
                ];
                (signals, None)
            }
        }
    }
}

/// Fuse with the default weights
pub fn fuse(inputs: &FusionInputs) -> FusionResult {
    RiskFusionEngine::new().fuse(inputs)
}
