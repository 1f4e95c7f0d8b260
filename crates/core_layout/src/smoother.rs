//! Exponential offset smoothing for the arc carousel.

use serde::{Deserialize, Serialize};

/// Default fraction of the remaining distance covered per frame.
pub const DEFAULT_SMOOTHING: f64 = 0.09;

/// Target/current offset pair.
///
/// Input handlers move the target; only [`OffsetSmoother::tick`] moves the current
/// value, so every layout read within a frame sees one consistent offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetSmoother {
    target: f64,
    current: f64,
    smoothing: f64,
    reduced_motion: bool,
}

impl Default for OffsetSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING, false)
    }
}

impl OffsetSmoother {
    /// Create a smoother at rest at offset zero.
    ///
    /// `smoothing` above 1 is clamped to 1; a non-positive or non-finite value
    /// falls back to the default.
    pub fn new(smoothing: f64, reduced_motion: bool) -> Self {
        let smoothing = if smoothing.is_finite() && smoothing > 0.0 {
            smoothing.min(1.0)
        } else {
            DEFAULT_SMOOTHING
        };
        Self {
            target: 0.0,
            current: 0.0,
            smoothing,
            reduced_motion,
        }
    }

    /// Add a delta to the target offset. The range is unconstrained.
    pub fn set_target(&mut self, delta: f64) {
        self.target += delta;
    }

    /// Advance the current offset one frame toward the target.
    pub fn tick(&mut self) {
        if self.reduced_motion {
            self.current = self.target;
        } else {
            self.current += (self.target - self.current) * self.smoothing;
        }
    }

    /// The offset layout reads from.
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Effective per-frame factor.
    pub fn smoothing(&self) -> f64 {
        if self.reduced_motion {
            1.0
        } else {
            self.smoothing
        }
    }

    /// Whether the current value still differs from the target.
    pub fn is_settling(&self) -> bool {
        self.current != self.target
    }
}
