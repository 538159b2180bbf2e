//! Numeric helpers shared by the analyzers
//!
//! Rounding follows round-half-up (`floor(x + 0.5)`) everywhere an integer is
//! produced, so `78.5 -> 79` and `-20.5 -> -20`.

use serde::{Deserialize, Serialize};

/// Absorbs representation error so that e.g. 78.5 never lands on 78.4999...
pub const ROUNDING_TOLERANCE: f64 = 1e-9;

/// Round half-up to the nearest integer
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round a computed score half-up, treating values within
/// [`ROUNDING_TOLERANCE`] below a `.5` boundary as on it
pub fn round_score(value: f64) -> f64 {
    round_half_up(value + ROUNDING_TOLERANCE)
}

/// Round to two decimal places (half-up)
pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) / 100.0
}

/// Single-pass running mean and population variance (Welford)
///
/// Memory is constant regardless of how many values are pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the pushed values, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Population variance, `0.0` when fewer than two values were pushed
    pub fn population_variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
