//! Shared state between the state machine and the animator.
//!
//! The tick loop owns one [`ModeState`] by value. The state machine
//! replaces it every tick; the animator only reads it.

use embassy_time::Instant;

/// High-level device mode. Exactly one is active at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// No host connected; advertising and waiting.
    Advertising,
    /// Connected, button up.
    ConnectedIdle,
    /// Connected, button held (key-down sent).
    ActivePress,
    /// Bonds erased; flashing before returning to advertising.
    BondClearing,
}

/// One debounced button reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonSample {
    pub pressed: bool,
    pub timestamp: Instant,
}

/// Mode plus the timestamps and button bookkeeping the transitions need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeState {
    pub mode: Mode,
    /// Reset on every mode change; anchors animations and mode timeouts.
    pub mode_entered_at: Instant,
    /// Last debounced edge or connection.
    pub last_activity_at: Instant,
    /// Debounced level seen on the previous tick.
    pub pressed: bool,
    /// Start of the current hold, if it can still trigger a bond clear.
    pub pressed_since: Option<Instant>,
    /// A key-down report went out and its key-up is still owed.
    pub key_held: bool,
}

impl ModeState {
    /// State at boot: advertising, nothing pressed.
    pub const fn boot(now: Instant) -> Self {
        Self {
            mode: Mode::Advertising,
            mode_entered_at: now,
            last_activity_at: now,
            pressed: false,
            pressed_since: None,
            key_held: false,
        }
    }

    /// Switch to `mode`, restarting the mode clock.
    pub(crate) fn enter(&mut self, mode: Mode, now: Instant) {
        self.mode = mode;
        self.mode_entered_at = now;
    }
}

/// Fresh inputs for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickInput {
    pub sample: ButtonSample,
    pub connected: bool,
    pub usb_present: bool,
    pub now: Instant,
}

/// HID edge to send to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidEvent {
    KeyDown,
    KeyUp,
}

/// Request for the power-management collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerIntent {
    pub enter_deep_sleep: bool,
}

impl PowerIntent {
    pub const STAY_AWAKE: Self = Self {
        enter_deep_sleep: false,
    };
    pub const DEEP_SLEEP: Self = Self {
        enter_deep_sleep: true,
    };
}

/// Result of one state machine tick: the next state plus side effects
/// for the external collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    pub state: ModeState,
    pub hid: Option<HidEvent>,
    /// Fire-and-forget bond erase request (raised on entry to `BondClearing`).
    pub erase_bonds: bool,
    pub power: PowerIntent,
}
