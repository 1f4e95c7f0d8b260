//! Wheel input gating for the arc carousel.

use serde::{Deserialize, Serialize};

use crate::Rect;

/// Fraction of the section that must be on screen before wheel input is taken.
pub const DEFAULT_MIN_VISIBLE_RATIO: f64 = 0.35;

/// Scale applied to accepted wheel deltas.
pub const DEFAULT_WHEEL_SCALE: f64 = 0.85;

/// Compute how much of `section` is visible inside a display of `viewport_height`.
///
/// The visible span is normalized by the smaller of the viewport height and the
/// section height, so a section taller than the display counts as fully visible
/// once it fills the screen. A zero viewport height is treated as 1 px.
pub fn visibility_ratio(section: Rect, viewport_height: f64) -> f64 {
    let vh = if viewport_height > 0.0 { viewport_height } else { 1.0 };
    let visible = vh.min(section.bottom().max(0.0)) - section.y.max(0.0);
    let height = if section.height > 0.0 { section.height } else { vh };
    visible / vh.min(height)
}

/// Decides whether a wheel delta reaches the offset target, and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelGate {
    pub min_visible_ratio: f64,
    pub delta_scale: f64,
}

impl Default for WheelGate {
    fn default() -> Self {
        Self {
            min_visible_ratio: DEFAULT_MIN_VISIBLE_RATIO,
            delta_scale: DEFAULT_WHEEL_SCALE,
        }
    }
}

impl WheelGate {
    /// Return the scaled delta, or `None` when the section is not visible enough.
    pub fn accept(&self, delta_y: f64, section: Rect, viewport_height: f64) -> Option<f64> {
        if visibility_ratio(section, viewport_height) < self.min_visible_ratio {
            return None;
        }
        Some(delta_y * self.delta_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_visible_section() {
        let section = Rect::new(0.0, 100.0, 1200.0, 400.0);
        assert!((visibility_ratio(section, 900.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_section_below_fold() {
        let section = Rect::new(0.0, 1200.0, 1200.0, 400.0);
        assert!(visibility_ratio(section, 900.0) < 0.0);
        assert_eq!(WheelGate::default().accept(100.0, section, 900.0), None);
    }

    #[test]
    fn test_partially_visible_threshold() {
        // 140 of 400 px visible -> exactly 0.35
        let section = Rect::new(0.0, 760.0, 1200.0, 400.0);
        let ratio = visibility_ratio(section, 900.0);
        assert!((ratio - 0.35).abs() < 1e-9);
        let accepted = WheelGate::default().accept(100.0, section, 900.0);
        assert!(accepted.is_some());
        assert!((accepted.unwrap_or_default() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_tall_section_normalized_by_viewport() {
        let section = Rect::new(0.0, -500.0, 1200.0, 3000.0);
        assert!((visibility_ratio(section, 800.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_gate() {
        let gate = WheelGate {
            min_visible_ratio: 0.9,
            delta_scale: 1.0,
        };
        let section = Rect::new(0.0, 600.0, 1000.0, 400.0);
        assert_eq!(gate.accept(50.0, section, 900.0), None);
    }
}
