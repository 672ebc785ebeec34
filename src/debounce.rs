//! Time-based debouncing for the push-to-talk switch.
//!
//! The switch is wired active-low with the internal pull-up enabled, so a
//! low pin level means "pressed". A level change is only reported once the
//! raw level has held steady for the debounce window; any bounce inside the
//! window restarts it.

use embassy_time::{Duration, Instant};

use crate::machine::since;
use crate::mode::ButtonSample;

/// Map the raw pin level to a pressed flag (active low).
pub const fn pin_is_pressed(level_high: bool) -> bool {
    !level_high
}

pub struct Debouncer {
    window: Duration,
    stable: bool,
    candidate: bool,
    candidate_since: Instant,
}

impl Debouncer {
    /// Start with the switch released.
    pub const fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            stable: false,
            candidate: false,
            candidate_since: now,
        }
    }

    /// Feed one raw reading and get the debounced sample for this tick.
    pub fn update(&mut self, raw_pressed: bool, now: Instant) -> ButtonSample {
        if raw_pressed != self.candidate {
            self.candidate = raw_pressed;
            self.candidate_since = now;
        } else if self.candidate != self.stable && since(self.candidate_since, now) >= self.window {
            self.stable = self.candidate;
        }

        ButtonSample {
            pressed: self.stable,
            timestamp: now,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}
