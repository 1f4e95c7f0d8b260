//! Showreel Headless Surface
//!
//! Stand-in for the rendering surface the engine measures and drives.
//!
//! This crate handles:
//! - Track measurement (item widths, gaps, viewport width, total scroll width)
//! - Appending clone sets of the base items
//! - Muted, looping media elements with a source, a load counter and a playhead
//! - Simulated playback starts that reject unplayable sources

use showreel_core_layout::{ItemId, MediaElement, MediaError, MediaSurface, TrackSurface};
use thiserror::Error;
use tracing::{debug, trace};

/// Video containers the simulated player accepts.
pub const SUPPORTED_CONTAINERS: &[&str] = &["mp4", "webm", "m4v", "mov", "ogv"];

/// Errors that can occur while building a surface.
#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("Item {index} has an invalid width: {width}")]
    InvalidWidth { index: usize, width: f64 },

    #[error("Gap must be a non-negative finite number, got {0}")]
    InvalidGap(f64),
}

/// A headless media element.
///
/// Marquee media is always muted, looping and inline; only the source,
/// pause flag and playhead change.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualMedia {
    src: Option<String>,
    loads: u32,
    paused: bool,
    playhead_secs: f64,
    pub muted: bool,
    pub looping: bool,
    pub inline: bool,
}

impl Default for VirtualMedia {
    fn default() -> Self {
        Self {
            src: None,
            loads: 0,
            paused: true,
            playhead_secs: 0.0,
            muted: true,
            looping: true,
            inline: true,
        }
    }
}

impl VirtualMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reloads requested so far.
    pub fn loads(&self) -> u32 {
        self.loads
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn playhead(&self) -> f64 {
        self.playhead_secs
    }

    /// Mark the element as running after a successful start.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Move the playhead forward while running.
    pub fn advance(&mut self, secs: f64) {
        if !self.paused {
            self.playhead_secs += secs;
        }
    }
}

impl MediaElement for VirtualMedia {
    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn set_source(&mut self, src: &str) {
        self.src = Some(src.to_string());
    }

    fn load(&mut self) {
        self.loads += 1;
        self.playhead_secs = 0.0;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn rewind(&mut self) {
        self.playhead_secs = 0.0;
    }
}

/// Decide whether a playback start for `src` would succeed.
pub fn simulate_play(src: Option<&str>) -> Result<(), MediaError> {
    let Some(src) = src else {
        return Err(MediaError::Unsupported("<no source>".to_string()));
    };
    let supported = src
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_CONTAINERS.iter().any(|c| *c == ext)
        })
        .unwrap_or(false);

    if supported {
        Ok(())
    } else {
        Err(MediaError::Unsupported(src.to_string()))
    }
}

#[derive(Debug, Clone)]
struct VirtualItem {
    width: f64,
    media: Option<VirtualMedia>,
}

/// A headless horizontal track of fixed-width items.
#[derive(Debug, Clone)]
pub struct VirtualTrack {
    items: Vec<VirtualItem>,
    base_count: usize,
    gap: f64,
    viewport_width: f64,
}

impl VirtualTrack {
    /// Build a track from the base item widths. `has_media[i]` gives item `i` a
    /// media element; missing entries mean no media.
    pub fn new(
        widths: &[f64],
        has_media: &[bool],
        gap: f64,
        viewport_width: f64,
    ) -> Result<Self, SurfaceError> {
        if !gap.is_finite() || gap < 0.0 {
            return Err(SurfaceError::InvalidGap(gap));
        }
        let mut items = Vec::with_capacity(widths.len());
        for (index, &width) in widths.iter().enumerate() {
            if !width.is_finite() || width < 0.0 {
                return Err(SurfaceError::InvalidWidth { index, width });
            }
            let media = has_media
                .get(index)
                .copied()
                .unwrap_or(false)
                .then(VirtualMedia::new);
            items.push(VirtualItem { width, media });
        }

        Ok(Self {
            base_count: items.len(),
            items,
            gap,
            viewport_width,
        })
    }

    /// Apply a new viewport width.
    pub fn set_viewport_width(&mut self, width: f64) {
        trace!("Track viewport width {} -> {}", self.viewport_width, width);
        self.viewport_width = width;
    }

    pub fn base_count(&self) -> usize {
        self.base_count
    }

    /// Number of clone sets appended so far.
    pub fn clone_sets(&self) -> usize {
        if self.base_count == 0 {
            0
        } else {
            self.items.len() / self.base_count - 1
        }
    }

    pub fn media(&self, item: ItemId) -> Option<&VirtualMedia> {
        self.items.get(item).and_then(|i| i.media.as_ref())
    }
}

impl TrackSurface for VirtualTrack {
    fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    fn scroll_width(&self) -> f64 {
        let widths: f64 = self.items.iter().map(|i| i.width).sum();
        widths + self.items.len().saturating_sub(1) as f64 * self.gap
    }

    fn gap(&self) -> f64 {
        self.gap
    }

    fn item_width(&self, index: usize) -> Option<f64> {
        self.items.get(index).map(|i| i.width)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn append_clone_set(&mut self) -> Vec<ItemId> {
        let start = self.items.len();
        // Clones copy content, not playback state.
        let clones: Vec<VirtualItem> = self.items[..self.base_count]
            .iter()
            .map(|item| VirtualItem {
                width: item.width,
                media: item.media.as_ref().map(|_| VirtualMedia::new()),
            })
            .collect();
        self.items.extend(clones);
        debug!("Appended clone set: items {}..{}", start, self.items.len());
        (start..self.items.len()).collect()
    }
}

impl MediaSurface for VirtualTrack {
    type Media = VirtualMedia;

    fn media_mut(&mut self, item: ItemId) -> Option<&mut VirtualMedia> {
        self.items.get_mut(item).and_then(|i| i.media.as_mut())
    }
}
