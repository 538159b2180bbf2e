//! Gaze heatmap analysis
//!
//! Infers an attentional-dispersion probability from a gaze-heat overlay image.
//! Red/orange "hot" pixels are located by a fixed RGB heuristic, their
//! intensity-weighted spatial spread is measured around the weighted centroid,
//! and the spread is normalized against the image diagonal.
//!
//! High spread means scattered gaze (higher risk); low spread means sustained
//! focus. The analyzer always answers: unreadable pixels and empty heatmaps map
//! to fixed low-confidence results instead of errors.

use crate::error::EngineError;
use crate::stats::round2;
use crate::types::{PixelBuffer, VisionAssessment, VisionStatus};
use serde::{Deserialize, Serialize};

/// Red channel must exceed this for a pixel to be hot
pub const HOT_RED_MIN: u8 = 150;

/// Blue channel must stay below this for a pixel to be hot
pub const HOT_BLUE_MAX: u8 = 100;

/// Green channel must stay below this for a pixel to be hot
pub const HOT_GREEN_MAX: u8 = 200;

/// Fraction of the quarter diagonal-squared treated as full dispersion
pub const DISPERSION_SENSITIVITY: f64 = 0.1;

/// Multiplier from hot-pixel coverage to confidence
pub const CONFIDENCE_SCALE: f64 = 50.0;

pub const CONFIDENCE_FLOOR: f64 = 0.4;
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Probabilities above this read as scattered focus
pub const SCATTERED_THRESHOLD: f64 = 0.6;

/// Probabilities below this read as sustained attention
pub const SUSTAINED_THRESHOLD: f64 = 0.3;

/// Result when no hot pixel was found
pub const NO_GAZE_PROBABILITY: f64 = 0.1;
pub const NO_GAZE_CONFIDENCE: f64 = 0.5;

/// Result when the pixel data could not be read
pub const FALLBACK_PROBABILITY: f64 = 0.5;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

const EXPLAIN_NO_GAZE: &str = "No gaze data detected in screening.";
const EXPLAIN_FAILED: &str = "Model inference failed, using baseline.";
const EXPLAIN_SCATTERED: &str = "Irregular gaze distribution detected (Scattered Focus).";
const EXPLAIN_SUSTAINED: &str = "Highly focused gaze patterns detected (Sustained Attention).";
const EXPLAIN_MODERATE: &str = "Moderate gaze variability observed.";

/// Tunable thresholds for the heatmap heuristic
///
/// The defaults are the values the screening app shipped with. They have not
/// been validated against labelled data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub hot_red_min: u8,
    pub hot_blue_max: u8,
    pub hot_green_max: u8,
    pub sensitivity: f64,
    pub confidence_scale: f64,
    pub confidence_floor: f64,
    pub confidence_ceiling: f64,
    pub scattered_threshold: f64,
    pub sustained_threshold: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            hot_red_min: HOT_RED_MIN,
            hot_blue_max: HOT_BLUE_MAX,
            hot_green_max: HOT_GREEN_MAX,
            sensitivity: DISPERSION_SENSITIVITY,
            confidence_scale: CONFIDENCE_SCALE,
            confidence_floor: CONFIDENCE_FLOOR,
            confidence_ceiling: CONFIDENCE_CEILING,
            scattered_threshold: SCATTERED_THRESHOLD,
            sustained_threshold: SUSTAINED_THRESHOLD,
        }
    }
}

/// Intensity-weighted spatial statistics of the hot region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeDispersion {
    pub centroid_x: f64,
    pub centroid_y: f64,
    /// Weighted mean squared distance from the centroid, in pixels squared
    pub variance: f64,
    pub hot_pixels: u64,
    pub total_mass: f64,
}

/// Heatmap gaze analyzer
#[derive(Debug, Clone, Default)]
pub struct HeatmapGazeAnalyzer {
    config: HeatmapConfig,
}

impl HeatmapGazeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HeatmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Analyze a decoded RGB image
    pub fn analyze(&self, image: &PixelBuffer) -> VisionAssessment {
        if !image.is_well_formed() {
            log::warn!(
                "heatmap buffer is {} bytes, expected {:?} for {}x{}; using fallback",
                image.data.len(),
                image.byte_len(),
                image.width,
                image.height
            );
            return Self::fallback();
        }

        let Some(dispersion) = self.measure(image) else {
            log::warn!("no hot pixels in {}x{} heatmap", image.width, image.height);
            return VisionAssessment {
                vision_probability: NO_GAZE_PROBABILITY,
                confidence: NO_GAZE_CONFIDENCE,
                explanation: EXPLAIN_NO_GAZE.to_string(),
                status: VisionStatus::NoGazeData,
            };
        };

        let w = image.width as f64;
        let h = image.height as f64;
        let reference = self.config.sensitivity * (w * w + h * h) / 4.0;
        let probability = if reference > 0.0 {
            (dispersion.variance / reference).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // Well-formed, so the byte length is exactly three per pixel
        let pixels = (image.data.len() / 3) as f64;
        let coverage = dispersion.hot_pixels as f64 / pixels;
        let confidence = (coverage * self.config.confidence_scale)
            .max(self.config.confidence_floor)
            .min(self.config.confidence_ceiling);

        let explanation = if probability > self.config.scattered_threshold {
            EXPLAIN_SCATTERED
        } else if probability < self.config.sustained_threshold {
            EXPLAIN_SUSTAINED
        } else {
            EXPLAIN_MODERATE
        };

        log::debug!(
            "heatmap centroid=({:.1},{:.1}) variance={:.2} hot={} coverage={:.4} p={:.3}",
            dispersion.centroid_x,
            dispersion.centroid_y,
            dispersion.variance,
            dispersion.hot_pixels,
            coverage,
            probability
        );

        VisionAssessment {
            vision_probability: round2(probability),
            confidence: round2(confidence),
            explanation: explanation.to_string(),
            status: VisionStatus::Analyzed,
        }
    }

    /// Decode PNG/JPEG bytes and analyze them; undecodable input yields the fallback
    pub fn analyze_encoded(&self, bytes: &[u8]) -> VisionAssessment {
        match decode_heatmap(bytes) {
            Ok(image) => self.analyze(&image),
            Err(e) => {
                log::warn!("{e}; using fallback");
                Self::fallback()
            }
        }
    }

    /// Weighted centroid and spread of hot pixels, `None` when there are none
    pub fn measure(&self, image: &PixelBuffer) -> Option<GazeDispersion> {
        let mut total_mass = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut hot_pixels = 0u64;

        self.scan_hot(image, |x, y, weight| {
            total_mass += weight;
            sum_x += x * weight;
            sum_y += y * weight;
            hot_pixels += 1;
        });

        if total_mass <= 0.0 {
            return None;
        }

        let centroid_x = sum_x / total_mass;
        let centroid_y = sum_y / total_mass;

        // Second pass keeps the spread exact for tight clusters far from the origin
        let mut spread = 0.0;
        self.scan_hot(image, |x, y, weight| {
            let dist_sq = (x - centroid_x).powi(2) + (y - centroid_y).powi(2);
            spread += dist_sq * weight;
        });

        Some(GazeDispersion {
            centroid_x,
            centroid_y,
            variance: spread / total_mass,
            hot_pixels,
            total_mass,
        })
    }

    /// Intensity weight of a pixel, `None` unless it is hot
    pub fn hot_weight(&self, rgb: [u8; 3]) -> Option<f64> {
        let [red, green, blue] = rgb;
        if red > self.config.hot_red_min
            && blue < self.config.hot_blue_max
            && green < self.config.hot_green_max
        {
            Some((red as f64 - blue as f64) / 255.0)
        } else {
            None
        }
    }

    fn scan_hot<F: FnMut(f64, f64, f64)>(&self, image: &PixelBuffer, mut visit: F) {
        let width = image.width as usize;
        if width == 0 {
            return;
        }
        for (i, px) in image.data.chunks_exact(3).enumerate() {
            if let Some(weight) = self.hot_weight([px[0], px[1], px[2]]) {
                let x = (i % width) as f64;
                let y = (i / width) as f64;
                visit(x, y, weight);
            }
        }
    }

    fn fallback() -> VisionAssessment {
        VisionAssessment {
            vision_probability: FALLBACK_PROBABILITY,
            confidence: FALLBACK_CONFIDENCE,
            explanation: EXPLAIN_FAILED.to_string(),
            status: VisionStatus::InferenceFailed,
        }
    }
}

/// Decode an encoded image into an RGB8 pixel buffer
pub fn decode_heatmap(bytes: &[u8]) -> Result<PixelBuffer, EngineError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| EngineError::ImageDecode(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(PixelBuffer::new(width, height, rgb.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    const BLUE: [u8; 3] = [0, 0, 255];
    const HOT: [u8; 3] = [255, 0, 0];

    #[test]
    fn test_all_blue_image_has_no_gaze_data() {
        let analyzer = HeatmapGazeAnalyzer::new();
        for (w, h) in [(1, 1), (16, 9), (120, 80)] {
            let result = analyzer.analyze(&PixelBuffer::filled(w, h, BLUE));
            assert_eq!(result.vision_probability, 0.1);
            assert_eq!(result.confidence, 0.5);
            assert_eq!(result.status, VisionStatus::NoGazeData);
            assert!(result.explanation.contains("No gaze data detected"));
        }
    }

    #[test]
    fn test_single_center_pixel_is_concentrated() {
        let mut image = PixelBuffer::filled(101, 101, BLUE);
        image.set_pixel(50, 50, HOT);

        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.vision_probability, 0.0);
        assert_eq!(result.status, VisionStatus::Analyzed);
        assert!(result.explanation.contains("Sustained Attention"));
        // One pixel out of 10201 is far below the floor
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn test_opposite_corners_are_scattered() {
        let mut image = PixelBuffer::filled(100, 100, BLUE);
        image.set_pixel(0, 0, HOT);
        image.set_pixel(99, 99, HOT);

        let analyzer = HeatmapGazeAnalyzer::new();
        let dispersion = analyzer.measure(&image).unwrap();
        assert!((dispersion.centroid_x - 49.5).abs() < 1e-9);
        assert!((dispersion.centroid_y - 49.5).abs() < 1e-9);

        let result = analyzer.analyze(&image);
        assert_eq!(result.vision_probability, 1.0);
        assert!(result.explanation.contains("Scattered Focus"));
    }

    #[test]
    fn test_moderate_spread() {
        // Reference for 10x10 is 0.1 * 200 / 4 = 5; pixels 3 apart give variance 2.25
        let mut image = PixelBuffer::filled(10, 10, BLUE);
        image.set_pixel(3, 5, HOT);
        image.set_pixel(6, 5, HOT);

        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.vision_probability, 0.45);
        assert!(result.explanation.contains("Moderate"));
    }

    #[test]
    fn test_intensity_weighting_pulls_centroid() {
        let analyzer = HeatmapGazeAnalyzer::new();
        let mut image = PixelBuffer::filled(10, 1, BLUE);
        image.set_pixel(0, 0, [255, 0, 0]); // weight 1.0
        image.set_pixel(9, 0, [160, 0, 90]); // weight 70/255

        let dispersion = analyzer.measure(&image).unwrap();
        let light = 70.0 / 255.0;
        let expected_x = 9.0 * light / (1.0 + light);
        assert!((dispersion.centroid_x - expected_x).abs() < 1e-9);
        assert_eq!(dispersion.hot_pixels, 2);
    }

    #[test]
    fn test_hot_classification_boundaries() {
        let analyzer = HeatmapGazeAnalyzer::new();
        assert!(analyzer.hot_weight([151, 199, 99]).is_some());
        assert!(analyzer.hot_weight([150, 0, 0]).is_none());
        assert!(analyzer.hot_weight([255, 200, 0]).is_none());
        assert!(analyzer.hot_weight([255, 0, 100]).is_none());

        let weight = analyzer.hot_weight([255, 0, 0]).unwrap();
        assert!((weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_is_capped() {
        let image = PixelBuffer::filled(8, 8, HOT);
        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_malformed_buffer_falls_back() {
        let image = PixelBuffer::new(10, 10, vec![255; 17]);
        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.vision_probability, 0.5);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.status, VisionStatus::InferenceFailed);
        assert!(result.explanation.contains("inference failed"));
    }

    #[test]
    fn test_oversized_dimensions_fall_back() {
        let image = PixelBuffer::new(u32::MAX, u32::MAX, vec![255; 12]);
        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.vision_probability, FALLBACK_PROBABILITY);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.status, VisionStatus::InferenceFailed);
    }

    #[test]
    fn test_confidence_scales_with_coverage() {
        // 3 hot pixels of 300: coverage 0.01 -> 0.5
        let mut image = PixelBuffer::filled(10, 30, BLUE);
        for x in 4..7 {
            image.set_pixel(x, 15, HOT);
        }
        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.confidence, 0.5);
        // variance 2/3 against a reference of 25
        assert_eq!(result.vision_probability, 0.03);
    }

    #[test]
    fn test_confidence_rounds_to_two_decimals() {
        // 2 hot pixels of 121: 50 * 2 / 121 = 0.8264...
        let mut image = PixelBuffer::filled(11, 11, BLUE);
        image.set_pixel(5, 5, HOT);
        image.set_pixel(6, 5, HOT);
        let result = HeatmapGazeAnalyzer::new().analyze(&image);
        assert_eq!(result.confidence, 0.83);
        // variance 0.25 against a reference of 6.05
        assert_eq!(result.vision_probability, 0.04);
        assert!(result.explanation.contains("Sustained Attention"));
    }

    #[test]
    fn test_undecodable_bytes_fall_back() {
        let result = HeatmapGazeAnalyzer::new().analyze_encoded(b"definitely not a png");
        assert_eq!(result.vision_probability, 0.5);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.status, VisionStatus::InferenceFailed);
    }

    #[test]
    fn test_encoded_png_matches_raw_analysis() {
        let mut img = RgbImage::from_pixel(20, 20, image::Rgb(BLUE));
        img.put_pixel(2, 2, image::Rgb(HOT));
        img.put_pixel(17, 17, image::Rgb(HOT));

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let analyzer = HeatmapGazeAnalyzer::new();
        let from_png = analyzer.analyze_encoded(&bytes);
        let raw = PixelBuffer::new(20, 20, img.into_raw());
        assert_eq!(from_png, analyzer.analyze(&raw));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = HeatmapConfig {
            hot_red_min: 100,
            ..HeatmapConfig::default()
        };
        let analyzer = HeatmapGazeAnalyzer::with_config(config);
        assert!(analyzer.hot_weight([120, 0, 0]).is_some());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let mut image = PixelBuffer::filled(30, 30, BLUE);
        image.set_pixel(4, 7, HOT);
        image.set_pixel(20, 25, [200, 120, 40]);
        let analyzer = HeatmapGazeAnalyzer::new();
        assert_eq!(analyzer.analyze(&image), analyzer.analyze(&image));
    }
}
