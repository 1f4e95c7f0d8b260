//! Constant-rate auto-scroll for the marquee track.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default scroll rate.
pub const DEFAULT_SPEED_PX_PER_SEC: f64 = 72.0;

/// Scroll position advanced by measured wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScroll {
    speed_px_per_sec: f64,
    position: f64,
    #[serde(skip)]
    last_tick: Option<Instant>,
    reduced_motion: bool,
}

impl Default for AutoScroll {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_PX_PER_SEC, false)
    }
}

impl AutoScroll {
    pub fn new(speed_px_per_sec: f64, reduced_motion: bool) -> Self {
        Self {
            speed_px_per_sec,
            position: 0.0,
            last_tick: None,
            reduced_motion,
        }
    }

    /// Current scroll position in `[0, base_width)`.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed_px_per_sec
    }

    /// Whether autoplay is disabled entirely.
    pub fn is_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Restart elapsed-time measurement from `now`.
    pub fn start(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    /// Time since the previous tick, never negative. The first call measures zero.
    pub fn elapsed(&mut self, now: Instant) -> Duration {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        dt
    }

    /// Advance by `dt` unless paused, wrapping modulo `base_width`.
    ///
    /// Returns the new position.
    pub fn advance(&mut self, dt: Duration, paused: bool, base_width: f64) -> f64 {
        if self.reduced_motion || paused {
            return self.position;
        }
        self.position += self.speed_px_per_sec * dt.as_secs_f64();
        self.wrap(base_width);
        self.position
    }

    /// Bring the position back into `[0, base_width)`.
    pub fn wrap(&mut self, base_width: f64) {
        if base_width <= 0.0 {
            return;
        }
        if self.position >= base_width {
            self.position -= base_width;
        }
        if !(0.0..base_width).contains(&self.position) {
            self.position = self.position.rem_euclid(base_width);
        }
    }
}
