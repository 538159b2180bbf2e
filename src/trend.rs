//! Longitudinal attention trend detection
//!
//! Compares the most recent screening's attention metric against the mean of
//! the (up to) three screenings immediately before it. Nothing is cached: every
//! call recomputes from the history it is handed.

use crate::stats::round_half_up;
use crate::types::{AttentionTrend, Screening, TrendSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of screenings before a trend is reported
pub const MIN_TREND_HISTORY: usize = 3;

/// Number of screenings preceding the latest that form the baseline
pub const BASELINE_WINDOW: usize = 3;

/// Attention drop (points) beyond which a regression is flagged
pub const REGRESSION_DROP: f64 = 15.0;

/// Attention gain (points) beyond which improvement is reported
pub const IMPROVEMENT_GAIN: f64 = 10.0;

/// Anything that carries an attention metric can be trended
pub trait AttentionSample {
    fn attention_metric(&self) -> f64;
}

impl AttentionSample for Screening {
    fn attention_metric(&self) -> f64 {
        self.attention_metric
    }
}

impl AttentionSample for f64 {
    fn attention_metric(&self) -> f64 {
        *self
    }
}

/// Minimal stored screening: when it happened and the attention it measured
///
/// Full `Screening` records also parse as this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionRecord {
    pub timestamp: DateTime<Utc>,
    pub attention_metric: f64,
}

impl AttentionSample for AttentionRecord {
    fn attention_metric(&self) -> f64 {
        self.attention_metric
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub min_history: usize,
    pub baseline_window: usize,
    pub regression_drop: f64,
    pub improvement_gain: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_history: MIN_TREND_HISTORY,
            baseline_window: BASELINE_WINDOW,
            regression_drop: REGRESSION_DROP,
            improvement_gain: IMPROVEMENT_GAIN,
        }
    }
}

/// Read-only view of the latest screening and its immediate predecessors
#[derive(Debug, Clone, Copy)]
pub struct TrendWindow<'a, T> {
    pub current: &'a T,
    pub baseline: &'a [T],
}

impl<'a, T: AttentionSample> TrendWindow<'a, T> {
    /// Anchor a window on the last element of an oldest-first history
    pub fn anchor(history: &'a [T], baseline_window: usize) -> Option<Self> {
        let (current, before) = history.split_last()?;
        let start = before.len().saturating_sub(baseline_window);
        Some(Self {
            current,
            baseline: &before[start..],
        })
    }

    pub fn baseline_mean(&self) -> Option<f64> {
        if self.baseline.is_empty() {
            return None;
        }
        let sum: f64 = self.baseline.iter().map(|s| s.attention_metric()).sum();
        Some(sum / self.baseline.len() as f64)
    }

    /// Latest attention minus the baseline mean
    pub fn delta(&self) -> Option<f64> {
        self.baseline_mean()
            .map(|mean| self.current.attention_metric() - mean)
    }
}

/// Trend analyzer
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Trend of the latest screening in an oldest-first history
    pub fn analyze_trend<T: AttentionSample>(&self, history: &[T]) -> TrendSignal {
        if history.len() < self.config.min_history {
            log::debug!(
                "trend needs {} screenings, have {}",
                self.config.min_history,
                history.len()
            );
            return TrendSignal::stable();
        }

        let Some(delta) = TrendWindow::anchor(history, self.config.baseline_window)
            .and_then(|window| window.delta())
        else {
            return TrendSignal::stable();
        };

        if delta < -self.config.regression_drop {
            let dropped = round_half_up(delta).abs() as i64;
            log::warn!("attention regression of {dropped} points against recent average");
            TrendSignal {
                regression_warning: Some(format!(
                    "Attention score dropped by {dropped}% compared to recent average."
                )),
                attention_trend: AttentionTrend::Declining,
            }
        } else if delta > self.config.improvement_gain {
            TrendSignal {
                regression_warning: None,
                attention_trend: AttentionTrend::Improving,
            }
        } else {
            TrendSignal::stable()
        }
    }
}

/// Trend with the default thresholds
pub fn analyze_trend<T: AttentionSample>(history: &[T]) -> TrendSignal {
    TrendAnalyzer::new().analyze_trend(history)
}
