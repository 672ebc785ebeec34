//! Input/connectivity state machine.
//!
//! ```text
//!               connected                press edge
//!  Advertising ───────────► ConnectedIdle ──────────► ActivePress
//!      ▲  │                      ▲                      │     │
//!      │  │ hold ≥ BOND_CLEAR    └──── release edge ────┘     │ hold ≥ BOND_CLEAR
//!      │  ▼                                                   ▼
//!      └──────────────── flash done ◄──────────────────── BondClearing
//! ```
//!
//! A disconnect sends every mode except `BondClearing` back to
//! `Advertising`. `BondClearing` always finishes its flash window first.
//!
//! The transition is a pure function of the previous [`ModeState`] and the
//! tick's inputs; HID reports, bond erasure and deep sleep are returned as
//! requests in the [`Step`] for the caller to carry out.

use embassy_time::Instant;

use crate::config::ButtonConfig;
use crate::mode::{HidEvent, Mode, ModeState, PowerIntent, Step, TickInput};
use crate::power_logic;

pub struct StateMachine<'a> {
    config: &'a ButtonConfig,
}

impl<'a> StateMachine<'a> {
    pub const fn new(config: &'a ButtonConfig) -> Self {
        Self { config }
    }

    /// Advance one tick.
    pub fn transition(&self, current: &ModeState, input: &TickInput) -> Step {
        let timings = &self.config.timings;
        let now = input.now;
        let mut state = *current;
        let mut hid = None;
        let mut erase_bonds = false;

        let pressed = input.sample.pressed;
        let press_edge = pressed && !state.pressed;
        let release_edge = !pressed && state.pressed;
        state.pressed = pressed;

        if press_edge {
            state.pressed_since = Some(now);
            state.last_activity_at = now;
        }
        if release_edge {
            state.pressed_since = None;
            state.last_activity_at = now;
            if state.key_held {
                state.key_held = false;
                hid = Some(HidEvent::KeyUp);
            }
        }

        if state.mode == Mode::BondClearing {
            if since(state.mode_entered_at, now) >= timings.bond_clear_flash {
                state.enter(Mode::Advertising, now);
            }
        } else if !input.connected {
            if state.mode != Mode::Advertising {
                state.enter(Mode::Advertising, now);
            }
        } else {
            if state.mode == Mode::Advertising {
                state.enter(Mode::ConnectedIdle, now);
                state.last_activity_at = now;
            }

            match state.mode {
                Mode::ConnectedIdle if press_edge => {
                    state.enter(Mode::ActivePress, now);
                    state.key_held = true;
                    hid = Some(HidEvent::KeyDown);
                }
                Mode::ActivePress if !state.pressed => {
                    state.enter(Mode::ConnectedIdle, now);
                }
                _ => {}
            }
        }

        if matches!(state.mode, Mode::Advertising | Mode::ActivePress) && self.hold_reached(&state, now) {
            state.enter(Mode::BondClearing, now);
            state.pressed_since = None;
            erase_bonds = true;
        }

        // Nothing can reach the host without a link; the host drops the
        // key state of a closed link anyway.
        if !input.connected {
            state.key_held = false;
            hid = None;
        }

        let power = self.power_intent(&state, input);

        Step {
            state,
            hid,
            erase_bonds,
            power,
        }
    }

    fn hold_reached(&self, state: &ModeState, now: Instant) -> bool {
        match state.pressed_since {
            Some(start) => since(start, now) >= self.config.timings.bond_clear_hold,
            None => false,
        }
    }

    fn power_intent(&self, state: &ModeState, input: &TickInput) -> PowerIntent {
        let timings = &self.config.timings;
        let due = match state.mode {
            Mode::Advertising => power_logic::deep_sleep_due(
                since(state.mode_entered_at, input.now),
                timings.adv_sleep_timeout,
                input.usb_present,
            ),
            Mode::ConnectedIdle => power_logic::deep_sleep_due(
                since(state.last_activity_at, input.now),
                timings.sleep_timeout,
                input.usb_present,
            ),
            Mode::ActivePress | Mode::BondClearing => false,
        };

        if due {
            PowerIntent::DEEP_SLEEP
        } else {
            PowerIntent::STAY_AWAKE
        }
    }
}

/// Monotonic elapsed time; a timestamp from the future counts as zero.
pub(crate) fn since(then: Instant, now: Instant) -> embassy_time::Duration {
    now.saturating_duration_since(then)
}
