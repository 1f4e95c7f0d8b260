//! The auto-scrolling, hover-reactive media marquee.
//!
//! Ties together the infinite content manager, the auto-scroll driver, the
//! pagination synchronizer and the hover media controller over one surface.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::autoscroll::{AutoScroll, DEFAULT_SPEED_PX_PER_SEC};
use crate::media::{HoverMediaController, MediaError, MediaSurface, PlayTicket, PlaybackState};
use crate::pagination::{Pagination, DEFAULT_PAGINATION_INTERVAL_MS};
use crate::track::{
    CloneOutcome, InfiniteContent, TrackSurface, DEFAULT_CLONE_GUARD, DEFAULT_CLONE_MULTIPLE,
};
use crate::{ItemId, WidgetError};

/// Track narrower than the viewport plus this much triggers a refill.
const DEFAULT_WIDTH_EPSILON: f64 = 2.0;

/// Content of one base marquee item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarqueeItem {
    pub title: String,
    /// Still image reference.
    pub image: Option<String>,
    /// Video source played on hover.
    pub video: Option<String>,
}

/// Tunables for a [`Marquee`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeSettings {
    pub speed_px_per_sec: f64,
    pub pagination_interval_ms: u64,
    pub clone_multiple: f64,
    pub clone_guard: u32,
    pub width_epsilon: f64,
    pub reduced_motion: bool,
}

impl Default for MarqueeSettings {
    fn default() -> Self {
        Self {
            speed_px_per_sec: DEFAULT_SPEED_PX_PER_SEC,
            pagination_interval_ms: DEFAULT_PAGINATION_INTERVAL_MS,
            clone_multiple: DEFAULT_CLONE_MULTIPLE,
            clone_guard: DEFAULT_CLONE_GUARD,
            width_epsilon: DEFAULT_WIDTH_EPSILON,
            reduced_motion: false,
        }
    }
}

/// Auto-scrolling marquee over a surface `S`.
///
/// The surface must append clone sets in base order, so track item `id`
/// shows base item `id % item_count`.
#[derive(Debug)]
pub struct Marquee<S> {
    surface: S,
    items: Vec<MarqueeItem>,
    content: InfiniteContent,
    scroll: AutoScroll,
    pagination: Pagination,
    media: HoverMediaController,
    hovered: HashSet<ItemId>,
    base_width: f64,
    width_epsilon: f64,
    /// Viewport width at which the clone guard last ran out.
    exhausted_at_viewport: Option<f64>,
}

impl<S> Marquee<S>
where
    S: TrackSurface + MediaSurface,
{
    /// Mount the marquee: grow the track, build pagination, bind media,
    /// measure the base set and start the clock at `now`.
    pub fn new(
        surface: Option<S>,
        items: Vec<MarqueeItem>,
        settings: MarqueeSettings,
        now: Instant,
    ) -> Result<Self, WidgetError> {
        let surface = surface.ok_or(WidgetError::MissingElement("track"))?;
        if items.is_empty() {
            return Err(WidgetError::NoItems("marquee"));
        }

        let count = items.len();
        let mut marquee = Self {
            surface,
            items,
            content: InfiniteContent::with_bounds(
                count,
                settings.clone_multiple,
                settings.clone_guard,
            ),
            scroll: AutoScroll::new(settings.speed_px_per_sec, settings.reduced_motion),
            pagination: Pagination::with_interval(count, settings.pagination_interval_ms),
            media: HoverMediaController::new(),
            hovered: HashSet::new(),
            base_width: 1.0,
            width_epsilon: settings.width_epsilon,
            exhausted_at_viewport: None,
        };

        marquee.refill();
        marquee.scroll.start(now);

        info!(
            "Marquee mounted: {} items, track of {} ({:.0}px), base width {:.0}px",
            count,
            marquee.surface.len(),
            marquee.surface.scroll_width(),
            marquee.base_width
        );
        Ok(marquee)
    }

    /// Bind every track item that has media and is not bound yet.
    ///
    /// Returns the number of newly bound items.
    pub fn bind_media(&mut self) -> usize {
        let count = self.items.len();
        let mut bound = 0;
        for id in 0..self.surface.len() {
            if self.media.is_bound(id) {
                continue;
            }
            let has_video = self.items[id % count].video.is_some();
            if has_video && self.surface.media_mut(id).is_some() && self.media.bind(id) {
                bound += 1;
            }
        }
        if bound > 0 {
            debug!("Bound hover media on {} track items", bound);
        }
        bound
    }

    /// Grow the track if needed, bind new clones and re-measure the base set.
    ///
    /// An exhausted guard is remembered for the current viewport width, so the
    /// frame driver does not grow the track again until the width changes.
    pub fn refill(&mut self) -> CloneOutcome {
        let outcome = self.content.ensure(&mut self.surface);
        self.exhausted_at_viewport = if outcome.is_satisfied() {
            None
        } else {
            Some(self.surface.viewport_width())
        };
        self.bind_media();
        self.base_width = self.content.base_width(&self.surface);
        self.scroll.wrap(self.base_width);
        outcome
    }

    /// Viewport dimensions changed; the surface already reflects the new size.
    ///
    /// A resize to the width the guard already gave up on appends nothing.
    pub fn handle_resize(&mut self) -> CloneOutcome {
        if self.is_exhausted() {
            return CloneOutcome::GuardExhausted {
                passes: 0,
                appended: Vec::new(),
            };
        }
        self.refill()
    }

    /// True while the clone guard has given up on the current viewport width.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted_at_viewport == Some(self.surface.viewport_width())
    }

    /// One frame of auto-scroll. Returns the scroll position.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let dt = self.scroll.elapsed(now);
        if self.scroll.is_reduced_motion() {
            return self.scroll.position();
        }

        if self.surface.scroll_width() <= self.surface.viewport_width() + self.width_epsilon
            && !self.is_exhausted()
        {
            self.refill();
        }

        let position = self.scroll.advance(dt, self.is_paused(), self.base_width);
        trace!("Marquee position {:.2} (dt {:?})", position, dt);
        position
    }

    /// Re-measure and recompute the active dot. Returns true when it moved.
    pub fn sync_pagination(&mut self) -> bool {
        self.base_width = self.content.base_width(&self.surface);
        self.pagination.sync(
            self.scroll.position(),
            self.surface.viewport_width(),
            self.base_width,
        )
    }

    fn start_media(&mut self, id: ItemId) -> Option<PlayTicket> {
        let count = self.items.len();
        let desired = self.items.get(id % count).and_then(|item| item.video.as_deref());
        let media = self.surface.media_mut(id)?;
        self.media.begin(id, desired, media)
    }

    fn stop_media(&mut self, id: ItemId) -> bool {
        match self.surface.media_mut(id) {
            Some(media) => self.media.end(id, media),
            None => false,
        }
    }

    /// Pointer entered a track item: pause the marquee and start its media.
    pub fn pointer_enter(&mut self, id: ItemId) -> Option<PlayTicket> {
        if id >= self.surface.len() {
            return None;
        }
        self.hovered.insert(id);
        self.start_media(id)
    }

    /// Pointer pressed on a track item: start its media without hovering.
    pub fn pointer_down(&mut self, id: ItemId) -> Option<PlayTicket> {
        if id >= self.surface.len() {
            return None;
        }
        self.start_media(id)
    }

    /// Pointer left a track item: resume if nothing else is hovered, stop its media.
    pub fn pointer_leave(&mut self, id: ItemId) -> bool {
        self.hovered.remove(&id);
        self.stop_media(id)
    }

    /// Pointer interaction was cancelled on a track item.
    pub fn pointer_cancel(&mut self, id: ItemId) -> bool {
        self.hovered.remove(&id);
        self.stop_media(id)
    }

    /// A track item lost focus.
    pub fn blur(&mut self, id: ItemId) -> bool {
        self.stop_media(id)
    }

    /// Feed back the outcome of a playback start.
    pub fn settle_playback(
        &mut self,
        ticket: PlayTicket,
        result: Result<(), MediaError>,
    ) -> PlaybackState {
        self.media.settle(ticket, result)
    }

    /// True while any item is hovered.
    pub fn is_paused(&self) -> bool {
        !self.hovered.is_empty()
    }

    pub fn position(&self) -> f64 {
        self.scroll.position()
    }

    pub fn base_width(&self) -> f64 {
        self.base_width
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[MarqueeItem] {
        &self.items
    }

    pub fn active_index(&self) -> usize {
        self.pagination.active()
    }

    pub fn dots(&self) -> Vec<bool> {
        self.pagination.dots()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn media(&self) -> &HoverMediaController {
        &self.media
    }

    pub fn hovered_items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.hovered.iter().copied().collect();
        items.sort_unstable();
        items
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable surface access, e.g. to apply a new viewport size before
    /// [`Marquee::handle_resize`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::media::tests::FakeMedia;
    use crate::media::MediaElement;
    use crate::track::tests::FakeTrack;

    struct FakeSurface {
        track: FakeTrack,
        media: Vec<FakeMedia>,
    }

    impl FakeSurface {
        fn new(widths: Vec<f64>, gap: f64, viewport: f64) -> Self {
            let media = widths.iter().map(|_| FakeMedia::default()).collect();
            Self {
                track: FakeTrack::new(widths, gap, viewport),
                media,
            }
        }
    }

    impl TrackSurface for FakeSurface {
        fn viewport_width(&self) -> f64 {
            self.track.viewport_width()
        }

        fn scroll_width(&self) -> f64 {
            self.track.scroll_width()
        }

        fn gap(&self) -> f64 {
            self.track.gap()
        }

        fn item_width(&self, index: usize) -> Option<f64> {
            self.track.item_width(index)
        }

        fn len(&self) -> usize {
            self.track.len()
        }

        fn append_clone_set(&mut self) -> Vec<ItemId> {
            let ids = self.track.append_clone_set();
            for _ in &ids {
                self.media.push(FakeMedia::default());
            }
            ids
        }
    }

    impl MediaSurface for FakeSurface {
        type Media = FakeMedia;

        fn media_mut(&mut self, item: ItemId) -> Option<&mut FakeMedia> {
            self.media.get_mut(item)
        }
    }

    fn items(n: usize) -> Vec<MarqueeItem> {
        (0..n)
            .map(|i| MarqueeItem {
                title: format!("Project {}", i),
                image: None,
                video: Some(format!("video/{}.mp4", i)),
            })
            .collect()
    }

    fn mounted(viewport: f64) -> (Marquee<FakeSurface>, Instant) {
        let now = Instant::now();
        let surface = FakeSurface::new(vec![200.0; 4], 20.0, viewport);
        let marquee = Marquee::new(Some(surface), items(4), MarqueeSettings::default(), now)
            .expect("valid marquee");
        (marquee, now)
    }

    #[test]
    fn test_mount_requires_track_and_items() {
        let now = Instant::now();
        let err = Marquee::<FakeSurface>::new(None, items(2), MarqueeSettings::default(), now);
        assert_eq!(err.err(), Some(WidgetError::MissingElement("track")));

        let surface = FakeSurface::new(vec![200.0], 0.0, 800.0);
        let err = Marquee::new(Some(surface), Vec::new(), MarqueeSettings::default(), now);
        assert_eq!(err.err(), Some(WidgetError::NoItems("marquee")));
    }

    #[test]
    fn test_mount_fills_and_binds_clones() {
        let (marquee, _) = mounted(1000.0);
        assert!(marquee.surface().scroll_width() >= 3000.0);
        assert_eq!(marquee.media().bound_count(), marquee.surface().len());
        // 4 * 200 + 3 * 20
        assert_eq!(marquee.base_width(), 860.0);
        assert_eq!(marquee.dots().len(), 4);
        assert_eq!(marquee.active_index(), 0);
    }

    #[test]
    fn test_tick_advances_and_wraps() {
        let (mut marquee, t0) = mounted(1000.0);
        let mut now = t0;
        for _ in 0..2_000 {
            now += Duration::from_millis(16);
            let pos = marquee.tick(now);
            assert!((0.0..marquee.base_width()).contains(&pos));
        }
        assert!(marquee.position() > 0.0);
    }

    #[test]
    fn test_hover_pauses_globally() {
        let (mut marquee, t0) = mounted(1000.0);
        marquee.tick(t0 + Duration::from_millis(500));
        let before = marquee.position();

        marquee.pointer_enter(5);
        assert!(marquee.is_paused());
        marquee.tick(t0 + Duration::from_millis(1500));
        assert_eq!(marquee.position(), before);

        marquee.pointer_leave(5);
        assert!(!marquee.is_paused());
        let after = marquee.tick(t0 + Duration::from_millis(2500));
        assert!((after - (before + 72.0)).abs() < 1e-6);
    }

    #[test]
    fn test_clone_media_gets_base_source() {
        let (mut marquee, _) = mounted(1000.0);
        let ticket = marquee.pointer_enter(6).expect("bound clone");
        assert_eq!(marquee.surface.media[6].source(), Some("video/2.mp4"));
        assert_eq!(marquee.settle_playback(ticket, Ok(())), PlaybackState::Playing);
        assert_eq!(marquee.media().playing_items(), vec![6]);

        assert!(marquee.blur(6));
        assert!(marquee.media().playing_items().is_empty());
        // Blur does not clear hover.
        assert!(marquee.is_paused());
    }

    #[test]
    fn test_pagination_follows_position() {
        let (mut marquee, t0) = mounted(400.0);
        // base 860, per item 215; advance 72 px/s for 5 s -> 360, center 560 -> index 2
        marquee.tick(t0 + Duration::from_secs(5));
        assert!(marquee.sync_pagination());
        assert_eq!(marquee.active_index(), 2);
    }

    #[test]
    fn test_reduced_motion_never_scrolls() {
        let now = Instant::now();
        let surface = FakeSurface::new(vec![200.0; 4], 20.0, 1000.0);
        let settings = MarqueeSettings {
            reduced_motion: true,
            ..MarqueeSettings::default()
        };
        let mut marquee =
            Marquee::new(Some(surface), items(4), settings, now).expect("valid marquee");
        assert_eq!(marquee.tick(now + Duration::from_secs(30)), 0.0);
    }

    #[test]
    fn test_resize_grows_and_binds_new_clones() {
        let (mut marquee, _) = mounted(1000.0);
        let before = marquee.surface().len();
        marquee.surface_mut().track.viewport = 3000.0;
        let outcome = marquee.handle_resize();
        assert!(outcome.is_satisfied());
        assert!(marquee.surface().len() > before);
        assert_eq!(marquee.media().bound_count(), marquee.surface().len());
    }

    #[test]
    fn test_tick_refills_narrow_track() {
        let (mut marquee, t0) = mounted(1000.0);
        // 4 sets of 4 items: 16 * 200 + 15 * 20
        assert_eq!(marquee.surface().scroll_width(), 3500.0);

        marquee.surface_mut().track.viewport = 3600.0;
        let pos = marquee.tick(t0 + Duration::from_secs(20));

        // 13 sets reach 3 * 3600
        assert_eq!(marquee.surface().len(), 52);
        assert_eq!(marquee.media().bound_count(), marquee.surface().len());
        assert_eq!(marquee.base_width(), 860.0);
        assert!((0.0..marquee.base_width()).contains(&pos));
        assert!(!marquee.is_exhausted());
    }

    #[test]
    fn test_exhausted_guard_stops_frame_growth() {
        let (mut marquee, t0) = mounted(1000.0);
        marquee.surface_mut().track.viewport = 1.0e7;

        marquee.tick(t0 + Duration::from_millis(16));
        // One guard run of 10 clone sets on top of the mounted 16 items
        assert_eq!(marquee.surface().len(), 56);
        assert!(marquee.is_exhausted());

        let mut now = t0 + Duration::from_millis(16);
        for _ in 0..60 {
            now += Duration::from_millis(16);
            marquee.tick(now);
        }
        assert_eq!(marquee.surface().len(), 56);
        assert_eq!(marquee.media().bound_count(), 56);

        // Same width again: nothing to do
        let outcome = marquee.handle_resize();
        assert_eq!(outcome.passes(), 0);
        assert!(!outcome.is_satisfied());
        assert_eq!(marquee.surface().len(), 56);

        // A new width gets one more bounded run
        marquee.surface_mut().track.viewport = 2.0e7;
        let outcome = marquee.handle_resize();
        assert_eq!(outcome.passes(), 10);
        assert_eq!(marquee.surface().len(), 96);
        marquee.tick(now + Duration::from_millis(16));
        assert_eq!(marquee.surface().len(), 96);
    }

    #[test]
    fn test_exhaustion_clears_once_satisfied() {
        let (mut marquee, t0) = mounted(1000.0);
        marquee.surface_mut().track.viewport = 1.0e7;
        marquee.tick(t0 + Duration::from_millis(16));
        assert!(marquee.is_exhausted());

        marquee.surface_mut().track.viewport = 1200.0;
        assert!(marquee.handle_resize().is_satisfied());
        assert!(!marquee.is_exhausted());
    }
}
