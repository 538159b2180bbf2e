//! Real-time metric collection
//!
//! Folds a live stream of tracked-landmark positions into the two scalar
//! metrics consumed by fusion:
//!
//! - `attention_metric`: mean of per-frame centered scores (100 centered, 40 not)
//! - `motor_metric`: population variance of the landmark's x position, scaled by
//!   1000, rounded half-up and capped at 100
//!
//! Frames without a detected face are skipped. The accumulator is constant-size,
//! so sessions of any length are safe. Session duration limits belong to the
//! capture layer; the collector summarizes whatever it was given.

use crate::stats::{round_score, RunningStats};
use crate::types::{FrameSample, Landmark, SessionMetrics};
use serde::{Deserialize, Serialize};

/// Capture-layer session cap in seconds
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 15;

/// Attention reported when no frame carried a face
pub const DEFAULT_ATTENTION_METRIC: f64 = 50.0;

pub const CENTERED_SCORE: f64 = 100.0;
pub const OFF_CENTER_SCORE: f64 = 40.0;

/// Scale from normalized-coordinate variance to the motor index
pub const MOTOR_VARIANCE_SCALE: f64 = 1000.0;
pub const MOTOR_METRIC_CAP: f64 = 100.0;

/// Open interval in normalized coordinates that counts as "centered"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterRegion {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for CenterRegion {
    fn default() -> Self {
        Self {
            x_min: 0.35,
            x_max: 0.65,
            y_min: 0.3,
            y_max: 0.7,
        }
    }
}

impl CenterRegion {
    pub fn contains(&self, landmark: &Landmark) -> bool {
        landmark.x > self.x_min
            && landmark.x < self.x_max
            && landmark.y > self.y_min
            && landmark.y < self.y_max
    }
}

/// Collector tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub center: CenterRegion,
    pub centered_score: f64,
    pub off_center_score: f64,
    pub empty_attention: f64,
    pub motor_scale: f64,
    pub motor_cap: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            center: CenterRegion::default(),
            centered_score: CENTERED_SCORE,
            off_center_score: OFF_CENTER_SCORE,
            empty_attention: DEFAULT_ATTENTION_METRIC,
            motor_scale: MOTOR_VARIANCE_SCALE,
            motor_cap: MOTOR_METRIC_CAP,
        }
    }
}

/// Single-writer accumulator for one live session
#[derive(Debug, Clone, Default)]
pub struct RealtimeMetricCollector {
    config: CollectorConfig,
    attention: RunningStats,
    horizontal: RunningStats,
    skipped: u64,
}

impl RealtimeMetricCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CollectorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Classify a landmark without recording it
    pub fn classify(&self, landmark: Landmark) -> FrameSample {
        FrameSample {
            landmark,
            centered: self.config.center.contains(&landmark),
        }
    }

    /// Record one frame; `None` means no face was detected
    pub fn push(&mut self, landmark: Option<Landmark>) -> Option<FrameSample> {
        let Some(landmark) = landmark else {
            self.skipped += 1;
            return None;
        };

        let sample = self.classify(landmark);
        let score = if sample.centered {
            self.config.centered_score
        } else {
            self.config.off_center_score
        };
        self.attention.push(score);
        self.horizontal.push(landmark.x);
        Some(sample)
    }

    /// Record a batch of frames in arrival order
    pub fn extend<I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = Option<Landmark>>,
    {
        for frame in frames {
            self.push(frame);
        }
    }

    pub fn frames_sampled(&self) -> u64 {
        self.attention.count()
    }

    pub fn frames_skipped(&self) -> u64 {
        self.skipped
    }

    /// Metrics over the frames seen so far, leaving the accumulator intact
    pub fn snapshot(&self) -> SessionMetrics {
        let attention_metric = self
            .attention
            .mean()
            .unwrap_or(self.config.empty_attention);

        let scaled = round_score(self.horizontal.population_variance() * self.config.motor_scale);
        let motor_metric = scaled.min(self.config.motor_cap);

        SessionMetrics {
            attention_metric,
            motor_metric,
            frames_sampled: self.frames_sampled(),
            frames_skipped: self.skipped,
        }
    }

    /// End the session and return its metrics
    pub fn finish(self) -> SessionMetrics {
        let metrics = self.snapshot();
        if metrics.frames_sampled == 0 {
            log::warn!(
                "session ended without face frames ({} skipped); using neutral defaults",
                metrics.frames_skipped
            );
        } else {
            log::debug!(
                "session metrics attention={:.1} motor={} frames={} skipped={}",
                metrics.attention_metric,
                metrics.motor_metric,
                metrics.frames_sampled,
                metrics.frames_skipped
            );
        }
        metrics
    }

    /// Discard everything collected so far
    pub fn reset(&mut self) {
        self.attention.clear();
        self.horizontal.clear();
        self.skipped = 0;
    }
}

/// Collect metrics over a finite frame sequence in one call
pub fn collect_metrics<I>(frames: I) -> SessionMetrics
where
    I: IntoIterator<Item = Option<Landmark>>,
{
    let mut collector = RealtimeMetricCollector::new();
    collector.extend(frames);
    collector.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(x: f64, y: f64) -> Option<Landmark> {
        Some(Landmark::new(x, y))
    }

    #[test]
    fn test_empty_stream_defaults() {
        let metrics = collect_metrics(Vec::<Option<Landmark>>::new());
        assert_eq!(metrics.attention_metric, 50.0);
        assert_eq!(metrics.motor_metric, 0.0);
        assert_eq!(metrics.frames_sampled, 0);
    }

    #[test]
    fn test_no_face_frames_are_skipped() {
        let metrics = collect_metrics(vec![None, None, None]);
        assert_eq!(metrics.attention_metric, 50.0);
        assert_eq!(metrics.motor_metric, 0.0);
        assert_eq!(metrics.frames_skipped, 3);

        // A skipped frame must not dilute attention
        let metrics = collect_metrics(vec![lm(0.5, 0.5), None, lm(0.5, 0.5)]);
        assert_eq!(metrics.attention_metric, 100.0);
        assert_eq!(metrics.frames_sampled, 2);
        assert_eq!(metrics.frames_skipped, 1);
    }

    #[test]
    fn test_center_region_is_open() {
        let collector = RealtimeMetricCollector::new();
        assert!(collector.classify(Landmark::new(0.5, 0.5)).centered);
        assert!(!collector.classify(Landmark::new(0.35, 0.5)).centered);
        assert!(!collector.classify(Landmark::new(0.65, 0.5)).centered);
        assert!(!collector.classify(Landmark::new(0.5, 0.3)).centered);
        assert!(!collector.classify(Landmark::new(0.5, 0.7)).centered);
        assert!(collector.classify(Landmark::new(0.36, 0.31)).centered);
    }

    #[test]
    fn test_attention_mean() {
        // 3 centered (100) + 1 off-center (40) = 340 / 4
        let metrics = collect_metrics(vec![
            lm(0.5, 0.5),
            lm(0.5, 0.5),
            lm(0.5, 0.5),
            lm(0.9, 0.5),
        ]);
        assert!((metrics.attention_metric - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_motor_metric_scaling() {
        // x in {0.4, 0.6}: mean 0.5, variance 0.01 -> 10
        let metrics = collect_metrics(vec![lm(0.4, 0.5), lm(0.6, 0.5)]);
        assert_eq!(metrics.motor_metric, 10.0);

        // x in {0.0, 1.0}: variance 0.25 -> 250, capped at 100
        let metrics = collect_metrics(vec![lm(0.0, 0.5), lm(1.0, 0.5)]);
        assert_eq!(metrics.motor_metric, 100.0);

        // Steady head: no motor variance
        let metrics = collect_metrics(vec![lm(0.52, 0.5); 30]);
        assert_eq!(metrics.motor_metric, 0.0);
    }

    #[test]
    fn test_motor_rounds_to_integer() {
        // x in {0.4, 0.5, 0.6}: variance 0.02 / 3 -> 6.67 -> 7
        let metrics = collect_metrics(vec![lm(0.4, 0.5), lm(0.5, 0.5), lm(0.6, 0.5)]);
        assert_eq!(metrics.motor_metric, 7.0);
    }

    #[test]
    fn test_motor_half_rounds_up() {
        // x in {0.0, 0.1}: variance 0.0025 -> 2.5 -> 3
        let metrics = collect_metrics(vec![lm(0.0, 0.5), lm(0.1, 0.5)]);
        assert_eq!(metrics.motor_metric, 3.0);
    }

    #[test]
    fn test_frame_order_does_not_matter() {
        let frames = vec![lm(0.31, 0.4), lm(0.58, 0.52), None, lm(0.47, 0.66), lm(0.7, 0.2)];
        let forward = collect_metrics(frames.clone());
        let backward = collect_metrics(frames.into_iter().rev());
        assert!((forward.attention_metric - backward.attention_metric).abs() < 1e-9);
        assert_eq!(forward.motor_metric, backward.motor_metric);
    }

    #[test]
    fn test_snapshot_then_continue() {
        let mut collector = RealtimeMetricCollector::new();
        collector.push(lm(0.5, 0.5));
        let partial = collector.snapshot();
        assert_eq!(partial.attention_metric, 100.0);

        collector.push(lm(0.1, 0.5));
        let done = collector.finish();
        assert_eq!(done.attention_metric, 70.0);
        assert_eq!(done.frames_sampled, 2);
    }

    #[test]
    fn test_reset() {
        let mut collector = RealtimeMetricCollector::new();
        collector.extend(vec![lm(0.1, 0.1), None]);
        collector.reset();
        assert_eq!(collector.frames_sampled(), 0);
        assert_eq!(collector.frames_skipped(), 0);
        assert_eq!(collector.snapshot().attention_metric, 50.0);
    }

    #[test]
    fn test_push_returns_classified_sample() {
        let mut collector = RealtimeMetricCollector::new();
        let sample = collector.push(lm(0.5, 0.5)).unwrap();
        assert!(sample.centered);
        assert!(collector.push(None).is_none());
    }
}
