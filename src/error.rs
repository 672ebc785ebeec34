//! Unified error type for the firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.
//!
//! None of these ever reach the state machine: a failed collaborator call
//! is logged and the tick loop carries on.

use defmt::Format;

/// Top-level error type used by the hardware plumbing.
#[derive(Debug, Format)]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    // Status pixel
    /// The PWM sequence for the WS2812 could not be started.
    Led,

    // Storage
    /// Flash read/write/erase failed.
    Storage,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, Format)]
pub enum BleError {
    /// GATT service registration failed at boot.
    RegisterFailed,
    /// Advertising could not be started.
    AdvertiseFailed,
    /// Input report notification failed (CCCD off or link gone).
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
