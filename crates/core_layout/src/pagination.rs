//! Discrete pagination indicator that follows the continuous track position.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default republish interval, coarser than a frame to hide sub-item jitter.
pub const DEFAULT_PAGINATION_INTERVAL_MS: u64 = 160;

/// Map a scroll position to the logical item nearest the viewport center.
///
/// Returns `None` for an empty base set. The result is always in `[0, item_count)`,
/// whatever the sign or size of `scroll_pos`.
pub fn active_index(
    scroll_pos: f64,
    viewport_width: f64,
    base_width: f64,
    item_count: usize,
) -> Option<usize> {
    if item_count == 0 {
        return None;
    }
    let per_item = (base_width / item_count as f64).max(1.0);
    let center = scroll_pos + viewport_width / 2.0;
    let raw = (center / per_item).floor();
    if !raw.is_finite() {
        return Some(0);
    }
    let n = item_count as i64;
    Some((((raw as i64) % n + n) % n) as usize)
}

/// Pagination dots sized to the base item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    item_count: usize,
    active: usize,
    interval_ms: u64,
}

impl Pagination {
    /// Build the dots once; the first dot starts active.
    pub fn new(item_count: usize) -> Self {
        Self::with_interval(item_count, DEFAULT_PAGINATION_INTERVAL_MS)
    }

    pub fn with_interval(item_count: usize, interval_ms: u64) -> Self {
        Self {
            item_count,
            active: 0,
            interval_ms,
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// How often [`Pagination::sync`] is meant to run.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Recompute the active dot. Returns true when it moved.
    pub fn sync(&mut self, scroll_pos: f64, viewport_width: f64, base_width: f64) -> bool {
        match active_index(scroll_pos, viewport_width, base_width, self.item_count) {
            Some(index) if index != self.active => {
                self.active = index;
                true
            }
            _ => false,
        }
    }

    /// One flag per dot; exactly one is set for a non-empty set.
    pub fn dots(&self) -> Vec<bool> {
        (0..self.item_count).map(|i| i == self.active).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_maps_to_item() {
        assert_eq!(active_index(500.0, 300.0, 1200.0, 6), Some(3));
    }

    #[test]
    fn test_index_wraps_past_base() {
        // center 1350 -> raw 6 -> wraps to 0
        assert_eq!(active_index(1200.0, 300.0, 1200.0, 6), Some(0));
    }

    #[test]
    fn test_index_valid_for_arbitrary_positions() {
        let mut pos = -10_000.0;
        while pos < 10_000.0 {
            for base in [1.0, 37.5, 999.0, 1200.0] {
                let idx = active_index(pos, 640.0, base, 7).expect("non-empty");
                assert!(idx < 7);
            }
            pos += 123.7;
        }
    }

    #[test]
    fn test_empty_set_is_noop() {
        assert_eq!(active_index(100.0, 300.0, 1200.0, 0), None);
        let mut p = Pagination::new(0);
        assert!(!p.sync(100.0, 300.0, 1200.0));
        assert!(p.dots().is_empty());
    }

    #[test]
    fn test_sync_reports_changes() {
        let mut p = Pagination::new(6);
        assert_eq!(p.dots(), vec![true, false, false, false, false, false]);
        assert!(p.sync(500.0, 300.0, 1200.0));
        assert_eq!(p.active(), 3);
        assert!(!p.sync(510.0, 300.0, 1200.0));
        assert_eq!(p.dots().iter().filter(|d| **d).count(), 1);
    }

    #[test]
    fn test_interval_default() {
        assert_eq!(Pagination::new(3).interval(), Duration::from_millis(160));
    }
}
