//! NeuroBridge Risk - behavioral risk scoring and trend analysis engine
//!
//! Turns per-session screening signals into an overall risk score and tier,
//! then watches a patient's screenings over time for attention regressions:
//! heatmap gaze analysis → live metric collection → fusion → history → trend.
//!
//! ## Modules
//!
//! - **Analyzers**: heatmap gaze dispersion and per-frame attention/motor metrics
//! - **Scoring**: weighted fusion into a 0-100 score and Low/Medium/High tier
//! - **Longitudinal**: patient history, attention trend, progress and therapy plans

pub mod collector;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fusion;
pub mod heatmap;
pub mod history;
pub mod pipeline;
pub mod progress;
pub mod stats;
pub mod therapy;
pub mod trend;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use collector::{collect_metrics, RealtimeMetricCollector};
pub use config::EngineConfig;
pub use encoder::{ReportEncoder, SessionReport};
pub use error::EngineError;
pub use fusion::{fuse, FusionInputs, RiskFusionEngine};
pub use heatmap::{decode_heatmap, HeatmapGazeAnalyzer};
pub use history::PatientHistory;
pub use pipeline::{screen_session, screen_session_json, ScreeningProcessor, SessionInput, VisionInput};
pub use progress::{progress_report, ProgressReport};
pub use therapy::{TherapyPlan, TherapyPlanner};
pub use trend::{analyze_trend, AttentionRecord, TrendAnalyzer};
pub use types::{
    AttentionTrend, FusionResult, Landmark, PixelBuffer, RiskLevel, Screening, SessionMetrics,
    TrendSignal, VisionAssessment,
};

/// Engine version embedded in all session reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session reports
pub const PRODUCER_NAME: &str = "neurobridge-risk";
