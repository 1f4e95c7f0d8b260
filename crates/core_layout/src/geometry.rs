//! Breakpoint-dependent arc geometry.

use serde::{Deserialize, Serialize};

/// Resolved geometry for one layout pass.
///
/// A fresh snapshot is produced for every resolution; it is never patched in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal spacing between neighbouring cards on the virtual strip.
    pub step: f64,
    /// Radius used to turn strip position into an arc angle.
    pub arc_radius: f64,
    /// Height of the arc bulge.
    pub arc_amplitude: f64,
    /// Vertical center of the stage the cards hang from.
    pub center_y: f64,
}

/// Tunable breakpoint table the resolver reads from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcGeometry {
    /// Viewport widths at or above this value use the wide constants.
    pub wide_breakpoint: f64,
    pub wide_step: f64,
    pub narrow_step: f64,
    pub wide_radius: f64,
    pub narrow_radius: f64,
    pub wide_amplitude: f64,
    pub narrow_amplitude: f64,
    /// Fraction of the stage height where the arc is centered.
    pub center_ratio: f64,
}

impl Default for ArcGeometry {
    fn default() -> Self {
        Self {
            wide_breakpoint: 900.0,
            wide_step: 150.0,
            narrow_step: 128.0,
            wide_radius: 520.0,
            narrow_radius: 420.0,
            wide_amplitude: 135.0,
            narrow_amplitude: 110.0,
            center_ratio: 0.62,
        }
    }
}

impl ArcGeometry {
    /// Check whether a viewport width falls on the wide side of the breakpoint.
    pub fn is_wide(&self, viewport_width: f64) -> bool {
        viewport_width >= self.wide_breakpoint
    }

    /// Resolve the layout constants for the current viewport and stage.
    pub fn resolve(&self, viewport_width: f64, stage_height: f64) -> LayoutConfig {
        let wide = self.is_wide(viewport_width);
        LayoutConfig {
            step: if wide { self.wide_step } else { self.narrow_step },
            arc_radius: if wide { self.wide_radius } else { self.narrow_radius },
            arc_amplitude: if wide {
                self.wide_amplitude
            } else {
                self.narrow_amplitude
            },
            center_y: stage_height * self.center_ratio,
        }
    }
}
