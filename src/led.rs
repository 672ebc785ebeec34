//! NeoPixel (WS2812B) output on the PWM peripheral.
//!
//! Each frame is encoded into PWM duty words (see `chirp_button::ws2812`)
//! and played once by EasyDMA. A frame plus latch gap takes ~90 µs, so the
//! write blocks for that long instead of awaiting the sequence end.

use chirp_button::config::NEO_COUNT;
use chirp_button::ws2812::{self, BITS_PER_LED, PWM_MAX_DUTY, RESET_PERIODS};
use chirp_button::LedFrame;
use defmt::warn;
use embassy_nrf::gpio::Pin as GpioPin;
use embassy_nrf::peripherals::PWM0;
use embassy_nrf::pwm::{
    Config, Prescaler, SequenceConfig, SequenceLoad, SequencePwm, SingleSequenceMode,
    SingleSequencer,
};
use embassy_nrf::Peripheral;
use embassy_time::{block_for, Duration};
use smart_leds::{SmartLedsWrite, RGB8};

use crate::error::Error;

const WORDS: usize = NEO_COUNT * BITS_PER_LED;

/// Time for one full frame plus the latch gap.
const FRAME_TIME: Duration = Duration::from_micros(100);

pub struct Ws2812<'d> {
    pwm: SequencePwm<'d, PWM0>,
    words: [u16; WORDS],
}

impl<'d> Ws2812<'d> {
    pub fn new(
        pwm: impl Peripheral<P = PWM0> + 'd,
        data_pin: impl Peripheral<P = impl GpioPin> + 'd,
    ) -> Result<Self, Error> {
        let mut config = Config::default();
        config.sequence_load = SequenceLoad::Common;
        config.prescaler = Prescaler::Div1;
        config.max_duty = PWM_MAX_DUTY;

        let pwm = SequencePwm::new_1ch(pwm, data_pin, config).map_err(|_| Error::Led)?;
        Ok(Self {
            pwm,
            words: [ws2812::RES; WORDS],
        })
    }
}

impl SmartLedsWrite for Ws2812<'_> {
    type Error = Error;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let mut colors = [RGB8::default(); NEO_COUNT];
        for (slot, color) in colors.iter_mut().zip(iterator) {
            *slot = color.into();
        }
        let len = ws2812::encode_strip(&colors, &mut self.words).ok_or(Error::BufferOverflow)?;

        let mut seq_config = SequenceConfig::default();
        seq_config.end_delay = RESET_PERIODS;

        let sequencer = SingleSequencer::new(&mut self.pwm, &self.words[..len], seq_config);
        sequencer
            .start(SingleSequenceMode::Times(1))
            .map_err(|_| Error::Led)?;
        // Dropping the sequencer stops the PWM; let the frame finish first.
        block_for(FRAME_TIME);
        Ok(())
    }
}

/// The status pixel: skips rewriting an unchanged frame.
pub struct StatusLed<'d> {
    strip: Ws2812<'d>,
    last: Option<LedFrame>,
}

impl<'d> StatusLed<'d> {
    pub fn new(strip: Ws2812<'d>) -> Self {
        Self { strip, last: None }
    }

    pub fn show(&mut self, frame: LedFrame) {
        if self.last == Some(frame) {
            return;
        }
        match self.strip.write(core::iter::repeat(RGB8::from(frame)).take(NEO_COUNT)) {
            Ok(()) => self.last = Some(frame),
            Err(e) => warn!("LED: write failed: {:?}", e),
        }
    }

    pub fn off(&mut self) {
        self.show(LedFrame::OFF);
    }
}
