//! WS2812B bit encoding for the nRF PWM peripheral.
//!
//! The PWM runs at 16 MHz with a 20-tick (1.25 µs) period, one period per
//! data bit. Each bit becomes one duty word; bit 15 selects inverted
//! polarity so the duty value is the high time of the pulse.

use smart_leds::RGB8;

/// Data bits per pixel.
pub const BITS_PER_LED: usize = 24;

/// PWM counter top: 20 ticks at 16 MHz = 1.25 µs per bit.
pub const PWM_MAX_DUTY: u16 = 20;

/// High time of a `1` bit (0.8 µs).
pub const T1H: u16 = 0x8000 | 13;

/// High time of a `0` bit (0.4 µs).
pub const T0H: u16 = 0x8000 | 7;

/// Line held low after the frame.
pub const RES: u16 = 0x8000;

/// Latch gap after the last bit, in PWM periods (> 50 µs).
pub const RESET_PERIODS: u32 = 48;

/// Encode one pixel (GRB order, MSB first) into PWM duty words.
pub fn encode(color: RGB8, words: &mut [u16; BITS_PER_LED]) {
    let grb = [color.g, color.r, color.b];
    for (byte_idx, byte) in grb.iter().enumerate() {
        for bit in 0..8 {
            let set = byte & (0x80 >> bit) != 0;
            words[byte_idx * 8 + bit] = if set { T1H } else { T0H };
        }
    }
}

/// Encode a strip of pixels into `words`. Returns the number of words used,
/// or `None` if `words` cannot hold them all.
pub fn encode_strip(colors: &[RGB8], words: &mut [u16]) -> Option<usize> {
    let needed = colors.len() * BITS_PER_LED;
    if words.len() < needed {
        return None;
    }
    for (color, chunk) in colors.iter().zip(words.chunks_exact_mut(BITS_PER_LED)) {
        let chunk: &mut [u16; BITS_PER_LED] = chunk.try_into().ok()?;
        encode(*color, chunk);
    }
    Some(needed)
}
