//! Host-testable core of the Chirp Button firmware.
//!
//! Everything that decides *what* the button does lives here and runs on
//! the host (no embedded hardware required):
//!
//! - [`machine`]: advertising / idle / press / bond-clear state machine
//! - [`animator`]: breathe, solid, flash and fade patterns for the pixel
//! - [`debounce`]: switch debouncing
//! - [`link`]: when a bond clear may drop the host
//! - [`hid`], [`ws2812`], [`bond`]: byte layouts for the radio, the pixel
//!   and flash
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and only adds the hardware plumbing around these modules.

#![cfg_attr(not(test), no_std)]

pub mod animator;
pub mod bond;
pub mod color;
pub mod config;
pub mod debounce;
pub mod hid;
pub mod link;
pub mod machine;
pub mod mode;
pub mod power_logic;
pub mod ws2812;

pub use animator::Animator;
pub use color::{Brightness, Color, LedFrame};
pub use config::{ButtonConfig, HidAction};
pub use machine::StateMachine;
pub use mode::{ButtonSample, HidEvent, Mode, ModeState, PowerIntent, Step, TickInput};
