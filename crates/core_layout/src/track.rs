//! Infinite content management for the scrolling track.
//!
//! The track is the base item set followed by as many clone sets as needed to
//! cover a multiple of the viewport width. Growth is a bounded loop: a surface
//! that reports pathological measurements stops after a fixed number of passes
//! instead of cloning forever.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ItemId;

/// Default multiple of the viewport width the track must cover.
pub const DEFAULT_CLONE_MULTIPLE: f64 = 3.0;

/// Default maximum number of clone passes per ensure call.
pub const DEFAULT_CLONE_GUARD: u32 = 10;

/// Measurement and mutation seam for a rendered track.
///
/// Hosts implement this over whatever actually renders the items; tests
/// implement it over synthetic widths.
pub trait TrackSurface {
    /// Width of the visible viewport.
    fn viewport_width(&self) -> f64;

    /// Rendered width of the whole track, clones included.
    fn scroll_width(&self) -> f64;

    /// Gap between adjacent items.
    fn gap(&self) -> f64;

    /// Rendered width of the item at track position `index`.
    fn item_width(&self, index: usize) -> Option<f64>;

    /// Number of items currently in the track.
    fn len(&self) -> usize;

    /// Whether the track has no items at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one copy of the base set, returning the ids of the new items.
    fn append_clone_set(&mut self) -> Vec<ItemId>;
}

/// Measure the base set: the first `original_count` items plus the gaps between them.
///
/// Clones are excluded since they repeat the same width. Floored at 1 px so the
/// result is always safe to use as a modulus.
pub fn base_width<S: TrackSurface + ?Sized>(surface: &S, original_count: usize) -> f64 {
    let mut width = 0.0;
    for index in 0..original_count {
        match surface.item_width(index) {
            Some(w) => width += w,
            None => break,
        }
    }
    width += original_count.saturating_sub(1) as f64 * surface.gap();
    width.max(1.0)
}

/// Result of one ensure pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloneOutcome {
    /// The track covers the target width.
    Satisfied { passes: u32, appended: Vec<ItemId> },
    /// The guard stopped growth before the target width was reached.
    GuardExhausted { passes: u32, appended: Vec<ItemId> },
}

impl CloneOutcome {
    pub fn passes(&self) -> u32 {
        match self {
            Self::Satisfied { passes, .. } | Self::GuardExhausted { passes, .. } => *passes,
        }
    }

    /// Ids of every item appended during this call.
    pub fn appended(&self) -> &[ItemId] {
        match self {
            Self::Satisfied { appended, .. } | Self::GuardExhausted { appended, .. } => appended,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

/// Keeps a track long enough to look endless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfiniteContent {
    original_count: usize,
    multiple: f64,
    guard_limit: u32,
}

impl InfiniteContent {
    /// Create a manager for a base set of `original_count` items with default bounds.
    pub fn new(original_count: usize) -> Self {
        Self::with_bounds(original_count, DEFAULT_CLONE_MULTIPLE, DEFAULT_CLONE_GUARD)
    }

    pub fn with_bounds(original_count: usize, multiple: f64, guard_limit: u32) -> Self {
        Self {
            original_count,
            multiple,
            guard_limit,
        }
    }

    pub fn original_count(&self) -> usize {
        self.original_count
    }

    pub fn guard_limit(&self) -> u32 {
        self.guard_limit
    }

    /// Width the track has to reach for the given viewport.
    pub fn target_width(&self, viewport_width: f64) -> f64 {
        viewport_width * self.multiple
    }

    /// Append clone sets until the track covers the target width or the guard runs out.
    pub fn ensure<S: TrackSurface + ?Sized>(&self, surface: &mut S) -> CloneOutcome {
        let target = self.target_width(surface.viewport_width());
        let mut appended = Vec::new();
        let mut passes = 0;

        while surface.scroll_width() < target && passes < self.guard_limit {
            appended.extend(surface.append_clone_set());
            passes += 1;
        }

        if surface.scroll_width() >= target {
            if passes > 0 {
                debug!(
                    "Track grown by {} clone passes to {:.0}px (target {:.0}px)",
                    passes,
                    surface.scroll_width(),
                    target
                );
            }
            CloneOutcome::Satisfied { passes, appended }
        } else {
            warn!(
                "Clone guard exhausted after {} passes: track {:.0}px short of {:.0}px",
                passes,
                surface.scroll_width(),
                target
            );
            CloneOutcome::GuardExhausted { passes, appended }
        }
    }

    /// Measure the base set on `surface`.
    pub fn base_width<S: TrackSurface + ?Sized>(&self, surface: &S) -> f64 {
        base_width(surface, self.original_count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Synthetic track: fixed item widths, clones append the first `base` widths again.
    pub(crate) struct FakeTrack {
        pub widths: Vec<f64>,
        pub base: usize,
        pub gap: f64,
        pub viewport: f64,
    }

    impl FakeTrack {
        pub(crate) fn new(widths: Vec<f64>, gap: f64, viewport: f64) -> Self {
            let base = widths.len();
            Self {
                widths,
                base,
                gap,
                viewport,
            }
        }
    }

    impl TrackSurface for FakeTrack {
        fn viewport_width(&self) -> f64 {
            self.viewport
        }

        fn scroll_width(&self) -> f64 {
            let sum: f64 = self.widths.iter().sum();
            sum + self.widths.len().saturating_sub(1) as f64 * self.gap
        }

        fn gap(&self) -> f64 {
            self.gap
        }

        fn item_width(&self, index: usize) -> Option<f64> {
            self.widths.get(index).copied()
        }

        fn len(&self) -> usize {
            self.widths.len()
        }

        fn append_clone_set(&mut self) -> Vec<ItemId> {
            let start = self.widths.len();
            let base: Vec<f64> = self.widths[..self.base].to_vec();
            self.widths.extend(base);
            (start..self.widths.len()).collect()
        }
    }

    #[test]
    fn test_base_width_excludes_clones() {
        let mut track = FakeTrack::new(vec![200.0, 300.0, 250.0], 10.0, 800.0);
        assert_eq!(base_width(&track, 3), 770.0);
        track.append_clone_set();
        assert_eq!(base_width(&track, 3), 770.0);
    }

    #[test]
    fn test_base_width_floor() {
        let track = FakeTrack::new(Vec::new(), 10.0, 800.0);
        assert_eq!(base_width(&track, 0), 1.0);
    }

    #[test]
    fn test_ensure_reaches_target() {
        let mut track = FakeTrack::new(vec![300.0; 4], 20.0, 1000.0);
        let manager = InfiniteContent::new(4);
        let outcome = manager.ensure(&mut track);
        assert!(outcome.is_satisfied());
        assert!(track.scroll_width() >= 3000.0);
        assert_eq!(outcome.appended().len(), outcome.passes() as usize * 4);
        assert_eq!(outcome.appended()[0], 4);
    }

    #[test]
    fn test_ensure_noop_when_long_enough() {
        let mut track = FakeTrack::new(vec![1000.0; 4], 0.0, 1000.0);
        let outcome = InfiniteContent::new(4).ensure(&mut track);
        assert_eq!(
            outcome,
            CloneOutcome::Satisfied {
                passes: 0,
                appended: Vec::new()
            }
        );
        assert_eq!(track.len(), 4);
    }

    #[test]
    fn test_guard_stops_growth() {
        let mut track = FakeTrack::new(vec![10.0], 0.0, 100_000.0);
        let outcome = InfiniteContent::new(1).ensure(&mut track);
        assert!(!outcome.is_satisfied());
        assert_eq!(outcome.passes(), 10);
        assert_eq!(track.len(), 11);
    }

    #[test]
    fn test_invariant_after_ensure() {
        for viewport in [200.0, 900.0, 1920.0, 4000.0, 9000.0] {
            let mut track = FakeTrack::new(vec![180.0, 240.0, 210.0], 16.0, viewport);
            let manager = InfiniteContent::new(3);
            let outcome = manager.ensure(&mut track);
            assert!(
                track.scroll_width() >= viewport * 3.0 || outcome.passes() == manager.guard_limit()
            );
        }
    }
}
