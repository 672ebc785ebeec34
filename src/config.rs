//! Application-wide constants and compile-time configuration.
//!
//! All pin assignments, colours, timing parameters and HID settings live
//! here so they can be tuned in one place. The core logic never reads the
//! constants directly: they are gathered into a [`ButtonConfig`] that is
//! built once at startup and handed to the state machine and animator.

use embassy_time::Duration;

use crate::color::{Brightness, Color};

// GPIO pin assignments (Seeed XIAO nRF52840)
//
// These are logical names; the actual `embassy_nrf::peripherals::*` types
// are selected in `main.rs`.
//
//   PTT switch (Cherry MX, active low, pull-up) → A2 = P0.28
//   WS2812B data line                           → A3 = P0.29

/// Port-0 pin number of the push-to-talk switch.
pub const PTT_PIN: u8 = 28;

/// Port-0 pin number of the WS2812B data line.
pub const NEO_PIN: u8 = 29;

/// Number of pixels on the data line.
pub const NEO_COUNT: usize = 1;

/// Global pixel brightness (0-255), applied after every animation.
pub const NEO_BRIGHTNESS: u8 = 80;

// BLE

/// Advertised GAP device name.
pub const BLE_DEVICE_NAME: &str = "Chirp Button";

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms (lowest latency for HID).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency. A single key can afford to skip a few events.
pub const BLE_SLAVE_LATENCY: u16 = 4;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

// HID

/// F13 = 0x68 per USB HID Usage Tables §10 (Keyboard/Keypad page).
pub const HID_KEY: u8 = 0x68;

/// Right Ctrl bit of the boot-keyboard modifier byte.
pub const HID_MODIFIER: u8 = 0x10;

// Colours, packed 0x00RRGGBB

/// Advertising breathe hue (blue).
pub const COLOR_ADV: u32 = 0x0000_00FF;
/// Connected idle breathe hue (green).
pub const COLOR_IDLE: u32 = 0x0000_FF00;
/// Button held, solid (red).
pub const COLOR_ACTIVE: u32 = 0x00FF_0000;
/// Boot flash (blue).
pub const COLOR_BOOT: u32 = 0x0000_00FF;
/// Bond-clear flash (purple).
pub const COLOR_CLEAR: u32 = 0x0080_0080;

// Timing (milliseconds)

pub const DEBOUNCE_MS: u64 = 20;
pub const BREATHE_PERIOD_MS: u64 = 3_000;
/// Minimum animation level during breathe.
pub const BREATHE_MIN: u8 = 5;
/// Peak animation level during breathe.
pub const BREATHE_MAX: u8 = 180;
pub const BOND_CLEAR_HOLD_MS: u64 = 5_000;
pub const BOND_CLEAR_FLASH_MS: u64 = 3_000;
pub const BOND_CLEAR_FLASH_PERIOD_MS: u64 = 100;

/// Advertising without a connection for this long (on battery) → deep sleep.
pub const ADV_SLEEP_TIMEOUT_MS: u64 = 120_000;

/// Connected but untouched for this long (on battery) → deep sleep.
pub const SLEEP_TIMEOUT_MS: u64 = 600_000;

/// Connected-idle pixel starts fading out after this long (on battery).
pub const LED_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Length of the idle fade-out ramp.
pub const LED_FADE_DURATION_MS: u64 = 2_000;

/// One-shot boot flash shown before the first tick.
pub const BOOT_FLASH_MS: u64 = 500;

/// Main loop period.
pub const TICK_MS: u64 = 10;

// Bond storage

/// Flash region reserved for the bond record (see `memory.x`, 4 KB pages).
pub const BOND_FLASH_START: u32 = 0x000F_C000;
pub const BOND_FLASH_END: u32 = 0x0010_0000;

/// What the button sends to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidAction {
    /// A keyboard usage code in the first keycode slot.
    Key(u8),
    /// Modifier bits only, no keycode.
    Modifier(u8),
}

impl HidAction {
    /// Build-variant default: `HID_KEY`, or `HID_MODIFIER` with `hid-modifier`.
    pub const fn from_build() -> Self {
        if cfg!(feature = "hid-modifier") {
            HidAction::Modifier(HID_MODIFIER)
        } else {
            HidAction::Key(HID_KEY)
        }
    }
}

/// Per-mode indicator colours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Palette {
    pub advertising: Color,
    pub idle: Color,
    pub active: Color,
    pub boot: Color,
    pub clear: Color,
}

/// Breathe envelope bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BreatheRange {
    pub min: Brightness,
    pub max: Brightness,
}

/// Every time constant the core consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timings {
    pub debounce: Duration,
    pub breathe_period: Duration,
    pub bond_clear_hold: Duration,
    pub bond_clear_flash: Duration,
    pub bond_clear_flash_period: Duration,
    pub adv_sleep_timeout: Duration,
    pub sleep_timeout: Duration,
    pub led_idle_timeout: Duration,
    pub led_fade: Duration,
    pub boot_flash: Duration,
}

/// Immutable device configuration, built once and passed by reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonConfig {
    pub hid: HidAction,
    pub palette: Palette,
    pub breathe: BreatheRange,
    pub timings: Timings,
    /// Global pixel brightness applied after the animation level.
    pub brightness: Brightness,
}

impl ButtonConfig {
    /// Configuration assembled from the constants above.
    pub const DEFAULT: Self = Self::new();

    pub const fn new() -> Self {
        Self {
            hid: HidAction::from_build(),
            palette: Palette {
                advertising: Color::from_packed(COLOR_ADV),
                idle: Color::from_packed(COLOR_IDLE),
                active: Color::from_packed(COLOR_ACTIVE),
                boot: Color::from_packed(COLOR_BOOT),
                clear: Color::from_packed(COLOR_CLEAR),
            },
            breathe: BreatheRange {
                min: Brightness::new(BREATHE_MIN),
                max: Brightness::new(BREATHE_MAX),
            },
            timings: Timings {
                debounce: Duration::from_millis(DEBOUNCE_MS),
                breathe_period: Duration::from_millis(BREATHE_PERIOD_MS),
                bond_clear_hold: Duration::from_millis(BOND_CLEAR_HOLD_MS),
                bond_clear_flash: Duration::from_millis(BOND_CLEAR_FLASH_MS),
                bond_clear_flash_period: Duration::from_millis(BOND_CLEAR_FLASH_PERIOD_MS),
                adv_sleep_timeout: Duration::from_millis(ADV_SLEEP_TIMEOUT_MS),
                sleep_timeout: Duration::from_millis(SLEEP_TIMEOUT_MS),
                led_idle_timeout: Duration::from_millis(LED_IDLE_TIMEOUT_MS),
                led_fade: Duration::from_millis(LED_FADE_DURATION_MS),
                boot_flash: Duration::from_millis(BOOT_FLASH_MS),
            },
            brightness: Brightness::new(NEO_BRIGHTNESS),
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self::new()
    }
}
