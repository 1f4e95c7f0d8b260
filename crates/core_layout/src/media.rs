//! Hover-driven media playback.
//!
//! Each bound item runs its own small state machine:
//!
//! ```text
//! Idle --hover/press--> Starting --start ok--> Playing
//!   ^                       |                     |
//!   +----leave/blur/cancel--+---------------------+
//! ```
//!
//! Starting playback is asynchronous on real hosts, so [`HoverMediaController::begin`]
//! hands out a [`PlayTicket`] and the host reports back through
//! [`HoverMediaController::settle`]. Ending an item bumps its generation, which turns
//! any ticket still in flight into a no-op.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ItemId;

/// Why a playback start did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaError {
    #[error("Playback was blocked by the host")]
    Blocked,

    #[error("Unsupported media source: {0}")]
    Unsupported(String),

    #[error("Playback start was cancelled")]
    Cancelled,
}

/// Minimal media element the controller drives.
pub trait MediaElement {
    /// Currently assigned source, if any.
    fn source(&self) -> Option<&str>;

    /// Assign a new source.
    fn set_source(&mut self, src: &str);

    /// Ask the element to reload from its source.
    fn load(&mut self);

    fn pause(&mut self);

    /// Reset the playhead to the start.
    fn rewind(&mut self);
}

/// Gives the controller access to the media element behind a track item.
pub trait MediaSurface {
    type Media: MediaElement;

    /// Media element of `item`, or `None` if the item has no media.
    fn media_mut(&mut self, item: ItemId) -> Option<&mut Self::Media>;
}

/// Playback state of one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Marked as playing, start requested but not confirmed.
    Starting,
    Playing,
}

/// Handle for one in-flight playback start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayTicket {
    pub item: ItemId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    state: PlaybackState,
    generation: u64,
}

/// Per-item hover media state, plus the set of items already bound.
#[derive(Debug, Clone, Default)]
pub struct HoverMediaController {
    bound: HashSet<ItemId>,
    slots: HashMap<ItemId, Slot>,
}

impl HoverMediaController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an item. Returns false if it was already bound.
    pub fn bind(&mut self, item: ItemId) -> bool {
        if !self.bound.insert(item) {
            return false;
        }
        self.slots.insert(item, Slot::default());
        true
    }

    pub fn is_bound(&self, item: ItemId) -> bool {
        self.bound.contains(&item)
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub fn state(&self, item: ItemId) -> PlaybackState {
        self.slots.get(&item).map(|s| s.state).unwrap_or_default()
    }

    /// The "is-playing" marker: set from hover-begin until the item is ended.
    pub fn is_playing(&self, item: ItemId) -> bool {
        self.state(item) != PlaybackState::Idle
    }

    /// Items currently carrying the marker, in ascending order.
    pub fn playing_items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state != PlaybackState::Idle)
            .map(|(&item, _)| item)
            .collect();
        items.sort_unstable();
        items
    }

    /// Hover or press began on `item`.
    ///
    /// Assigns `desired_source` if the element holds a different one, marks the item
    /// and returns a ticket for the playback start. Unbound items and items that are
    /// already starting or playing yield `None`.
    pub fn begin<M: MediaElement + ?Sized>(
        &mut self,
        item: ItemId,
        desired_source: Option<&str>,
        media: &mut M,
    ) -> Option<PlayTicket> {
        if !self.is_bound(item) {
            return None;
        }
        let slot = self.slots.entry(item).or_default();
        if slot.state != PlaybackState::Idle {
            return None;
        }

        if let Some(src) = desired_source {
            if media.source() != Some(src) {
                media.set_source(src);
                media.load();
            }
        }

        slot.state = PlaybackState::Starting;
        slot.generation += 1;
        debug!("Item {} starting playback (generation {})", item, slot.generation);

        Some(PlayTicket {
            item,
            generation: slot.generation,
        })
    }

    /// Report how a playback start went.
    ///
    /// Stale tickets are ignored. A failed start is discarded: no retry, and the
    /// marker stays until the item is ended.
    pub fn settle(&mut self, ticket: PlayTicket, result: Result<(), MediaError>) -> PlaybackState {
        let Some(slot) = self.slots.get_mut(&ticket.item) else {
            return PlaybackState::Idle;
        };
        if slot.generation != ticket.generation || slot.state == PlaybackState::Idle {
            debug!("Ignoring stale playback result for item {}", ticket.item);
            return slot.state;
        }

        match result {
            Ok(()) => slot.state = PlaybackState::Playing,
            Err(e) => debug!("Playback start for item {} discarded: {}", ticket.item, e),
        }
        slot.state
    }

    /// Hover left, focus blurred or the pointer was cancelled on `item`.
    ///
    /// Pauses and rewinds the element. Returns true if the item was active.
    pub fn end<M: MediaElement + ?Sized>(&mut self, item: ItemId, media: &mut M) -> bool {
        let Some(slot) = self.slots.get_mut(&item) else {
            return false;
        };
        let was_active = slot.state != PlaybackState::Idle;
        slot.state = PlaybackState::Idle;
        slot.generation += 1;
        media.pause();
        media.rewind();
        was_active
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct FakeMedia {
        pub src: Option<String>,
        pub loads: u32,
        pub paused: bool,
        pub rewinds: u32,
    }

    impl MediaElement for FakeMedia {
        fn source(&self) -> Option<&str> {
            self.src.as_deref()
        }

        fn set_source(&mut self, src: &str) {
            self.src = Some(src.to_string());
        }

        fn load(&mut self) {
            self.loads += 1;
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn rewind(&mut self) {
            self.rewinds += 1;
        }
    }

    #[test]
    fn test_bind_is_idempotent() {
        let mut ctl = HoverMediaController::new();
        assert!(ctl.bind(3));
        assert!(!ctl.bind(3));
        assert_eq!(ctl.bound_count(), 1);
    }

    #[test]
    fn test_unbound_item_ignored() {
        let mut ctl = HoverMediaController::new();
        let mut media = FakeMedia::default();
        assert!(ctl.begin(0, Some("a.mp4"), &mut media).is_none());
        assert!(media.src.is_none());
        assert!(!ctl.end(0, &mut media));
    }

    #[test]
    fn test_begin_assigns_source_once() {
        let mut ctl = HoverMediaController::new();
        let mut media = FakeMedia::default();
        ctl.bind(0);

        let ticket = ctl.begin(0, Some("clip.mp4"), &mut media).expect("bound");
        assert_eq!(media.source(), Some("clip.mp4"));
        assert_eq!(media.loads, 1);
        assert_eq!(ctl.state(0), PlaybackState::Starting);
        assert!(ctl.is_playing(0));

        assert_eq!(ctl.settle(ticket, Ok(())), PlaybackState::Playing);
        ctl.end(0, &mut media);

        // Same source again: no reload.
        ctl.begin(0, Some("clip.mp4"), &mut media).expect("bound");
        assert_eq!(media.loads, 1);
    }

    #[test]
    fn test_reentrant_begin_ignored() {
        let mut ctl = HoverMediaController::new();
        let mut media = FakeMedia::default();
        ctl.bind(0);
        assert!(ctl.begin(0, Some("a.mp4"), &mut media).is_some());
        assert!(ctl.begin(0, Some("a.mp4"), &mut media).is_none());
    }

    #[test]
    fn test_failed_start_keeps_marker() {
        let mut ctl = HoverMediaController::new();
        let mut media = FakeMedia::default();
        ctl.bind(1);
        let ticket = ctl.begin(1, Some("a.mov"), &mut media).expect("bound");
        let state = ctl.settle(ticket, Err(MediaError::Blocked));
        assert_eq!(state, PlaybackState::Starting);
        assert!(ctl.is_playing(1));

        assert!(ctl.end(1, &mut media));
        assert!(!ctl.is_playing(1));
        assert!(media.paused);
        assert_eq!(media.rewinds, 1);
    }

    #[test]
    fn test_stale_ticket_after_end_is_ignored() {
        let mut ctl = HoverMediaController::new();
        let mut media = FakeMedia::default();
        ctl.bind(2);
        let ticket = ctl.begin(2, Some("a.mp4"), &mut media).expect("bound");
        ctl.end(2, &mut media);
        assert_eq!(ctl.settle(ticket, Ok(())), PlaybackState::Idle);
        assert!(!ctl.is_playing(2));
    }

    #[test]
    fn test_items_are_independent() {
        let mut ctl = HoverMediaController::new();
        let mut a = FakeMedia::default();
        let mut b = FakeMedia::default();
        ctl.bind(0);
        ctl.bind(1);

        let ta = ctl.begin(0, Some("a.mp4"), &mut a).expect("bound");
        ctl.settle(ta, Ok(()));
        let tb = ctl.begin(1, Some("b.mp4"), &mut b).expect("bound");
        ctl.settle(tb, Ok(()));

        // Hovering B does not stop A.
        assert_eq!(ctl.state(0), PlaybackState::Playing);
        assert_eq!(ctl.playing_items(), vec![0, 1]);

        ctl.end(0, &mut a);
        assert_eq!(ctl.playing_items(), vec![1]);
        assert!(!b.paused);
    }
}
