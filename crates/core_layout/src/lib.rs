//! Showreel Core Layout Engine
//!
//! Platform-agnostic motion and layout engine behind the two showreel carousels.
//!
//! This crate implements:
//! - An arc-shaped card carousel driven by accumulated wheel input, where cards
//!   ride an infinite ring and bank along a curved track
//! - An auto-scrolling media marquee whose track is grown by cloning the base
//!   item set until it comfortably exceeds the viewport
//! - A pagination indicator that follows the continuous marquee position
//! - A per-item hover state machine that starts and stops media playback
//!
//! Nothing here touches a real rendering surface. Measurements come in through
//! [`TrackSurface`], media through [`MediaElement`], and every frame produces plain
//! values the host applies however it likes.

pub mod arc;
pub mod autoscroll;
pub mod geometry;
pub mod input;
pub mod marquee;
pub mod media;
pub mod pagination;
pub mod smoother;
pub mod track;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arc::{
    arc_transform, wrap_symmetric, ArcCarousel, ArcSettings, Card, CardTransform, OverlayRequest,
};
pub use autoscroll::{AutoScroll, DEFAULT_SPEED_PX_PER_SEC};
pub use geometry::{ArcGeometry, LayoutConfig};
pub use input::{visibility_ratio, WheelGate, DEFAULT_MIN_VISIBLE_RATIO, DEFAULT_WHEEL_SCALE};
pub use marquee::{Marquee, MarqueeItem, MarqueeSettings};
pub use media::{
    HoverMediaController, MediaElement, MediaError, MediaSurface, PlayTicket, PlaybackState,
};
pub use pagination::{active_index, Pagination, DEFAULT_PAGINATION_INTERVAL_MS};
pub use smoother::{OffsetSmoother, DEFAULT_SMOOTHING};
pub use track::{
    base_width, CloneOutcome, InfiniteContent, TrackSurface, DEFAULT_CLONE_GUARD,
    DEFAULT_CLONE_MULTIPLE,
};

/// Identifier of a rendered track item (base item or clone).
/// Base items occupy ids `0..N`; clones continue the sequence in append order.
pub type ItemId = usize;

/// Errors that can occur while constructing a widget.
///
/// Frame paths never fail; only construction reports problems, and a failed
/// construction leaves no partial state behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Required element is missing: {0}")]
    MissingElement(&'static str),

    #[error("Widget {0} has no items")]
    NoItems(&'static str),
}

/// A rectangle in display coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.bottom(), 70.0);
    }

    #[test]
    fn test_widget_error_messages() {
        assert_eq!(
            WidgetError::MissingElement("stage").to_string(),
            "Required element is missing: stage"
        );
        assert_eq!(WidgetError::NoItems("arc").to_string(), "Widget arc has no items");
    }
}
