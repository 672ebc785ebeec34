//! Colour and brightness primitives for the status pixel.
//!
//! Colours come in as packed `0x00RRGGBB` words (the NeoPixel convention).
//! They are unpacked into independent channel bytes, scaled by the
//! animation level, then scaled again by the global brightness.

use smart_leds::RGB8;

/// Scale `value` by `scale / 256`, keeping 255 as the identity.
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// A bounded 0-255 brightness level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Brightness(u8);

impl Brightness {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(255);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Build from a float, clamping to 0-255 and rounding to nearest.
    pub fn from_f32(level: f32) -> Self {
        if level.is_nan() || level <= 0.0 {
            return Self::OFF;
        }
        if level >= 255.0 {
            return Self::FULL;
        }
        Self(libm::roundf(level) as u8)
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    /// Scale a single channel byte by this level.
    pub const fn scale(self, channel: u8) -> u8 {
        scale8(channel, self.0)
    }
}

/// An unscaled 24-bit colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Unpack `0x00RRGGBB`. The top byte is ignored.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            red: (packed >> 16) as u8,
            green: (packed >> 8) as u8,
            blue: packed as u8,
        }
    }

    pub const fn to_packed(self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }

    pub const fn scaled(self, level: Brightness) -> Self {
        Self {
            red: level.scale(self.red),
            green: level.scale(self.green),
            blue: level.scale(self.blue),
        }
    }
}

/// One rendered pixel value, ready for the LED driver.
///
/// Recomputed every tick; carries no identity beyond its channel values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedFrame {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LedFrame {
    pub const OFF: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
    };

    /// Apply the animation `level` to `color`, then the `global` brightness.
    pub const fn from_color(color: Color, level: Brightness, global: Brightness) -> Self {
        let c = color.scaled(level).scaled(global);
        Self {
            red: c.red,
            green: c.green,
            blue: c.blue,
        }
    }

    pub const fn is_off(self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }
}

impl From<LedFrame> for RGB8 {
    fn from(frame: LedFrame) -> Self {
        RGB8::new(frame.red, frame.green, frame.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale8_keeps_full_scale_as_identity() {
        assert_eq!(scale8(255, 255), 255);
        assert_eq!(scale8(128, 255), 128);
        assert_eq!(scale8(255, 128), 128);
        assert_eq!(scale8(200, 0), 0);
        assert_eq!(scale8(0, 200), 0);
    }

    #[test]
    fn unpack_source_colours() {
        assert_eq!(Color::from_packed(0x0000_00FF), Color::new(0, 0, 255));
        assert_eq!(Color::from_packed(0x0000_FF00), Color::new(0, 255, 0));
        assert_eq!(Color::from_packed(0x00FF_0000), Color::new(255, 0, 0));
        assert_eq!(Color::from_packed(0x0080_0080), Color::new(128, 0, 128));
    }

    #[test]
    fn unpack_ignores_top_byte() {
        assert_eq!(Color::from_packed(0xAB12_3456), Color::new(0x12, 0x34, 0x56));
        assert_eq!(Color::from_packed(0xAB12_3456).to_packed(), 0x0012_3456);
    }

    #[test]
    fn frame_applies_level_then_global() {
        let purple = Color::from_packed(0x0080_0080);
        let frame = LedFrame::from_color(purple, Brightness::FULL, Brightness::new(80));
        // 128 * 81 >> 8 = 40
        assert_eq!(frame, LedFrame { red: 40, green: 0, blue: 40 });

        let dim = LedFrame::from_color(purple, Brightness::new(127), Brightness::FULL);
        assert_eq!(dim, LedFrame { red: 64, green: 0, blue: 64 });
    }

    #[test]
    fn zero_brightness_is_dark() {
        let red = Color::new(255, 0, 0);
        assert!(LedFrame::from_color(red, Brightness::OFF, Brightness::FULL).is_off());
        assert!(LedFrame::from_color(red, Brightness::FULL, Brightness::OFF).is_off());
    }

    #[test]
    fn brightness_from_float_clamps() {
        assert_eq!(Brightness::from_f32(-3.0), Brightness::OFF);
        assert_eq!(Brightness::from_f32(f32::NAN), Brightness::OFF);
        assert_eq!(Brightness::from_f32(300.0), Brightness::FULL);
        assert_eq!(Brightness::from_f32(92.5).level(), 93);
        assert_eq!(Brightness::from_f32(5.0).level(), 5);
    }

    #[test]
    fn frame_converts_to_smart_leds_rgb() {
        let rgb: RGB8 = LedFrame { red: 1, green: 2, blue: 3 }.into();
        assert_eq!(rgb, RGB8::new(1, 2, 3));
    }
}
