//! Screening pipeline orchestration
//!
//! This module provides the public API for scoring a screening session.
//! Per session: vision input + collected metrics → boundary validation →
//! fusion → immutable screening record → history append → trend → report.

use crate::collector::RealtimeMetricCollector;
use crate::config::EngineConfig;
use crate::encoder::{ReportEncoder, SessionReport};
use crate::error::EngineError;
use crate::fusion::{check_range, FusionInputs, RiskFusionEngine};
use crate::heatmap::HeatmapGazeAnalyzer;
use crate::history::PatientHistory;
use crate::progress::{progress_report, ProgressReport};
use crate::stats::round2;
use crate::therapy::{TherapyPlan, TherapyPlanner};
use crate::trend::TrendAnalyzer;
use crate::types::{RiskBreakdown, Screening, SessionMetrics, TrendSignal, VisionAssessment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vision signal for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisionInput {
    /// Heatmap analyzer output; selects ensemble fusion
    Heatmap { assessment: VisionAssessment },
    /// Raw vision score without a heatmap; selects legacy fusion
    #[serde(rename_all = "camelCase")]
    Legacy { vision_score: f64 },
}

/// Everything known about a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    pub patient_id: String,
    /// Defaults to the time of recording
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub vision: VisionInput,
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub eeg_score: f64,
    #[serde(default)]
    pub notes: String,
}

impl SessionInput {
    /// Fusion inputs implied by the vision signal
    pub fn fusion_inputs(&self) -> FusionInputs {
        match &self.vision {
            VisionInput::Heatmap { assessment } => FusionInputs::Ensemble {
                vision_probability: Some(assessment.vision_probability),
                attention_metric: self.metrics.attention_metric,
                motor_metric: self.metrics.motor_metric,
            },
            VisionInput::Legacy { vision_score } => FusionInputs::Legacy {
                vision_score: *vision_score,
                eeg_score: self.eeg_score,
            },
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.patient_id.trim().is_empty() {
            return Err(EngineError::ParseError("patientId is empty".to_string()));
        }
        // Stored metrics must be valid even when the fusion mode ignores them
        check_range("attentionMetric", self.metrics.attention_metric, 0.0, 100.0, "0-100")?;
        check_range("motorMetric", self.metrics.motor_metric, 0.0, f64::MAX, ">= 0")?;
        check_range("eegScore", self.eeg_score, 0.0, 100.0, "0-100")?;
        self.fusion_inputs().validate()
    }

    fn assessment(&self) -> Option<&VisionAssessment> {
        match &self.vision {
            VisionInput::Heatmap { assessment } => Some(assessment),
            VisionInput::Legacy { .. } => None,
        }
    }
}

/// Validate and fuse a session into its screening record
fn build_screening(
    input: &SessionInput,
    fusion: &RiskFusionEngine,
) -> Result<(Screening, Option<RiskBreakdown>), EngineError> {
    input.validate()?;
    let result = fusion.fuse(&input.fusion_inputs());

    let (vision_score, vision_probability) = match &input.vision {
        VisionInput::Heatmap { assessment } => (
            round2(assessment.vision_probability * 100.0),
            Some(assessment.vision_probability),
        ),
        VisionInput::Legacy { vision_score } => (*vision_score, None),
    };

    let screening = Screening {
        id: Uuid::new_v4(),
        patient_id: input.patient_id.clone(),
        timestamp: input.timestamp.unwrap_or_else(Utc::now),
        vision_score,
        vision_probability,
        eeg_score: input.eeg_score,
        attention_metric: input.metrics.attention_metric,
        motor_metric: input.metrics.motor_metric,
        overall_score: result.overall_score,
        risk_level: result.risk_level,
        notes: input.notes.clone(),
    };

    Ok((screening, result.breakdown))
}

/// Score one session without history (stateless, one-shot).
///
/// The trend is always stable since there is nothing to compare against.
pub fn screen_session(
    input: &SessionInput,
    config: &EngineConfig,
) -> Result<SessionReport, EngineError> {
    config.validate()?;
    let fusion = RiskFusionEngine::with_config(config.fusion.clone());
    let (screening, breakdown) = build_screening(input, &fusion)?;
    let encoder = ReportEncoder::new();
    Ok(encoder.encode(
        &screening,
        input.assessment(),
        breakdown,
        Some(TrendSignal::stable()),
    ))
}

/// JSON in, JSON out variant of [`screen_session`]
///
/// # Example
/// ```ignore
/// let report_json = screen_session_json(session_json, &EngineConfig::default())?;
/// ```
pub fn screen_session_json(
    session_json: String,
    config: &EngineConfig,
) -> Result<String, EngineError> {
    let input: SessionInput = serde_json::from_str(&session_json)?;
    let report = screen_session(&input, config)?;
    serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
}

/// Stateful processor for one patient's screenings.
///
/// Single writer: a processor owns its patient's history for the duration of
/// a session and appends to it in arrival order.
pub struct ScreeningProcessor {
    config: EngineConfig,
    heatmap: HeatmapGazeAnalyzer,
    fusion: RiskFusionEngine,
    trend: TrendAnalyzer,
    therapy: TherapyPlanner,
    encoder: ReportEncoder,
    history: PatientHistory,
}

impl ScreeningProcessor {
    /// Create a processor with default settings
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self::build(PatientHistory::new(patient_id), EngineConfig::default())
    }

    /// Create a processor with custom thresholds
    pub fn with_config(
        patient_id: impl Into<String>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Self::from_history(PatientHistory::new(patient_id), config)
    }

    /// Resume from an existing history
    pub fn from_history(history: PatientHistory, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(history, config))
    }

    fn build(history: PatientHistory, config: EngineConfig) -> Self {
        Self {
            heatmap: HeatmapGazeAnalyzer::with_config(config.heatmap.clone()),
            fusion: RiskFusionEngine::with_config(config.fusion.clone()),
            trend: TrendAnalyzer::with_config(config.trend.clone()),
            therapy: TherapyPlanner::with_config(config.therapy.clone()),
            encoder: ReportEncoder::new(),
            config,
            history,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn heatmap_analyzer(&self) -> &HeatmapGazeAnalyzer {
        &self.heatmap
    }

    /// Fresh collector for a new live session
    pub fn new_collector(&self) -> RealtimeMetricCollector {
        RealtimeMetricCollector::with_config(self.config.collector.clone())
    }

    /// Score a session, append it to the history and report it with the trend
    pub fn record(&mut self, input: &SessionInput) -> Result<SessionReport, EngineError> {
        let (screening, breakdown) = build_screening(input, &self.fusion)?;
        self.history.append(screening.clone())?;

        let trends = self.trend();
        log::info!(
            "recorded screening {} for {}: score={} level={} trend={}",
            screening.id,
            screening.patient_id,
            screening.overall_score,
            screening.risk_level.as_str(),
            trends.attention_trend.as_str()
        );

        Ok(self
            .encoder
            .encode(&screening, input.assessment(), breakdown, Some(trends)))
    }

    /// Process a session given as JSON and return the report as JSON
    pub fn record_json(&mut self, session_json: &str) -> Result<String, EngineError> {
        let input: SessionInput = serde_json::from_str(session_json)?;
        let report = self.record(&input)?;
        serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
    }

    /// Trend over the whole history
    pub fn trend(&self) -> TrendSignal {
        self.trend.analyze_trend(self.history.as_slice())
    }

    pub fn progress(&self) -> ProgressReport {
        progress_report(&self.history, &self.config.progress, &self.trend)
    }

    pub fn therapy_plan(&self) -> TherapyPlan {
        self.therapy.plan(self.history.latest())
    }

    pub fn history(&self) -> &PatientHistory {
        &self.history
    }

    /// Save history to JSON for the caller's storage
    pub fn save_history(&self) -> Result<String, EngineError> {
        self.history.to_json()
    }

    /// Replace the history with one loaded from JSON for the same patient
    pub fn load_history(&mut self, json: &str) -> Result<(), EngineError> {
        let loaded = PatientHistory::from_json(json)?;
        if loaded.patient_id() != self.history.patient_id() {
            return Err(EngineError::PatientMismatch {
                expected: self.history.patient_id().to_string(),
                actual: loaded.patient_id().to_string(),
            });
        }
        self.history = loaded;
        Ok(())
    }
}
