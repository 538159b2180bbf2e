//! Error types for the NeuroBridge risk engine
//!
//! Degraded analysis results (undecodable heatmaps, empty frame streams, short
//! histories) are not errors. These variants cover the boundary checks only.

use thiserror::Error;

/// Errors that can occur at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid metric {name}: {value} (expected {expected})")]
    InvalidMetric {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Screening belongs to patient {actual}, history belongs to {expected}")]
    PatientMismatch { expected: String, actual: String },

    #[error("Screening at {incoming} precedes the latest recorded screening at {last}")]
    OutOfOrder { last: String, incoming: String },

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
