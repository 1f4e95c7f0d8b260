//! Arc layout engine and the wheel-driven card carousel built on it.
//!
//! Cards sit on a virtual horizontal strip that wraps into a ring. Each card's
//! strip position is bent onto an upward-bulging arc; distance from the apex
//! drives scale, stacking and brightness to fake perspective.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geometry::{ArcGeometry, LayoutConfig};
use crate::input::WheelGate;
use crate::smoother::OffsetSmoother;
use crate::{Rect, WidgetError};

/// Degrees of banking per radian of arc angle.
const ROTATION_PER_RADIAN: f64 = 18.0;
/// Fraction of the amplitude the apex is lifted by.
const APEX_LIFT: f64 = 0.9;
/// Depth reaches zero slightly before the seam.
const DEPTH_FALLOFF: f64 = 0.95;

/// Visual transform for one card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardTransform {
    /// Card index in the base set.
    pub index: usize,
    /// Horizontal position relative to the stage center, after wrapping.
    pub x: f64,
    /// Vertical position: stage center plus arc sag.
    pub y: f64,
    /// Banking rotation in degrees.
    pub rotation_deg: f64,
    pub scale: f64,
    /// Stacking order; the apex card is on top.
    pub z_index: i32,
    pub brightness: f64,
    /// Proximity to the apex in `[0, 1]`.
    pub depth: f64,
}

/// Wrap `x` into `[-total/2, total/2)` so the strip behaves as a ring.
///
/// A non-positive `total` leaves `x` untouched.
pub fn wrap_symmetric(x: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return x;
    }
    let half = total / 2.0;
    ((x + half) % total + total) % total - half
}

/// Compute the transform of card `index` out of `count` at the given offset.
///
/// Returns `None` when `count` is zero.
pub fn arc_transform(
    index: usize,
    count: usize,
    offset: f64,
    config: &LayoutConfig,
) -> Option<CardTransform> {
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let total = n * config.step;
    let half = total / 2.0;
    let mid = (n - 1.0) / 2.0;

    let x = wrap_symmetric((index as f64 - mid) * config.step + offset, total);

    let angle = if config.arc_radius != 0.0 {
        x / config.arc_radius
    } else {
        0.0
    };
    let sag = -angle.cos() * config.arc_amplitude + config.arc_amplitude * APEX_LIFT;

    let depth = if half > 0.0 {
        (1.0 - (x.abs() / (half * DEPTH_FALLOFF)).min(1.0)).clamp(0.0, 1.0)
    } else {
        1.0
    };

    Some(CardTransform {
        index,
        x,
        y: config.center_y + sag,
        rotation_deg: angle * ROTATION_PER_RADIAN,
        scale: 0.92 + depth * 0.22,
        z_index: (100.0 + depth * 120.0).round() as i32,
        brightness: 0.78 + depth * 0.28,
        depth,
    })
}

/// Content of one arc card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    /// Descriptive text shown in the detail overlay.
    pub reason: String,
    /// Image reference, if the card has one.
    pub image: Option<String>,
}

/// What the overlay collaborator receives when a card is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRequest {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

/// Tunables for an [`ArcCarousel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSettings {
    pub geometry: ArcGeometry,
    pub gate: WheelGate,
    pub smoothing: f64,
    pub reduced_motion: bool,
}

impl Default for ArcSettings {
    fn default() -> Self {
        Self {
            geometry: ArcGeometry::default(),
            gate: WheelGate::default(),
            smoothing: crate::smoother::DEFAULT_SMOOTHING,
            reduced_motion: false,
        }
    }
}

/// The wheel-driven arc carousel.
#[derive(Debug, Clone)]
pub struct ArcCarousel {
    cards: Vec<Card>,
    stage: Rect,
    viewport_width: f64,
    geometry: ArcGeometry,
    gate: WheelGate,
    layout: LayoutConfig,
    smoother: OffsetSmoother,
}

impl ArcCarousel {
    /// Create a carousel over `cards` hanging from `stage`.
    ///
    /// Fails without creating anything if the stage is absent or there are no cards.
    pub fn new(
        stage: Option<Rect>,
        cards: Vec<Card>,
        viewport_width: f64,
        settings: ArcSettings,
    ) -> Result<Self, WidgetError> {
        let stage = stage.ok_or(WidgetError::MissingElement("stage"))?;
        if cards.is_empty() {
            return Err(WidgetError::NoItems("arc"));
        }

        let layout = settings.geometry.resolve(viewport_width, stage.height);
        debug!(
            "Arc carousel created: {} cards, step={}, radius={}",
            cards.len(),
            layout.step,
            layout.arc_radius
        );

        Ok(Self {
            cards,
            stage,
            viewport_width,
            geometry: settings.geometry,
            gate: settings.gate,
            layout,
            smoother: OffsetSmoother::new(settings.smoothing, settings.reduced_motion),
        })
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Always false for a constructed carousel.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout
    }

    pub fn smoother(&self) -> &OffsetSmoother {
        &self.smoother
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    /// Feed a wheel delta. Returns the delta added to the target, if accepted.
    pub fn wheel(&mut self, delta_y: f64, section: Rect, viewport_height: f64) -> Option<f64> {
        let accepted = self.gate.accept(delta_y, section, viewport_height)?;
        self.smoother.set_target(accepted);
        Some(accepted)
    }

    /// Re-resolve geometry after the viewport or stage changed size.
    pub fn resize(&mut self, viewport_width: f64, stage_height: f64) {
        self.viewport_width = viewport_width;
        self.stage.height = stage_height;
        let layout = self.geometry.resolve(viewport_width, stage_height);
        if layout != self.layout {
            debug!(
                "Arc layout re-resolved for width {}: step={}",
                viewport_width, layout.step
            );
        }
        self.layout = layout;
    }

    /// Transforms for every card at the current offset.
    pub fn layout(&self) -> Vec<CardTransform> {
        let offset = self.smoother.current();
        (0..self.cards.len())
            .filter_map(|i| arc_transform(i, self.cards.len(), offset, &self.layout))
            .collect()
    }

    /// Advance one frame: move the offset, then lay out against the new value.
    pub fn tick(&mut self) -> Vec<CardTransform> {
        self.smoother.tick();
        let frame = self.layout();
        trace!("Arc frame at offset {:.2}", self.smoother.current());
        frame
    }

    /// Build the overlay request for an activated card.
    pub fn activate(&self, index: usize) -> Option<OverlayRequest> {
        self.cards.get(index).map(|card| OverlayRequest {
            title: card.title.clone(),
            text: card.reason.clone(),
            image: card.image.clone(),
        })
    }
}
