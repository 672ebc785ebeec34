//! Push-to-talk switch input (active-low with internal pull-up).
//!
//! The switch is polled once per control tick rather than edge-driven: the
//! state machine needs a sample every tick anyway to time the bond-clear
//! hold, and polling keeps the GPIOTE channels free.

use chirp_button::debounce::{pin_is_pressed, Debouncer};
use chirp_button::ButtonSample;
use defmt::debug;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

pub struct PttButton<P> {
    pin: P,
    debouncer: Debouncer,
}

impl<P: InputPin> PttButton<P> {
    pub fn new(pin: P, debounce: Duration, now: Instant) -> Self {
        Self {
            pin,
            debouncer: Debouncer::new(debounce, now),
        }
    }

    /// Read the pin and return the debounced sample for this tick.
    ///
    /// A pin read error counts as "released".
    pub fn sample(&mut self, now: Instant) -> ButtonSample {
        let was_pressed = self.debouncer.is_pressed();
        let raw = self.pin.is_high().map(pin_is_pressed).unwrap_or(false);
        let sample = self.debouncer.update(raw, now);
        if sample.pressed != was_pressed {
            debug!("Button: pressed={}", sample.pressed);
        }
        sample
    }
}
