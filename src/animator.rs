//! LED animator - turns the current [`ModeState`] into a pixel colour.
//!
//! | Mode            | Pattern                                  |
//! |-----------------|------------------------------------------|
//! | Advertising     | blue breathe                             |
//! | ConnectedIdle   | green breathe, fades out on battery idle |
//! | ActivePress     | solid red                                |
//! | BondClearing    | purple square-wave flash                 |
//!
//! Every pattern is a pure function of the state and the current time.
//! Breathe phase is anchored to `mode_entered_at`, so each mode entry
//! starts at the bottom of the envelope.

use core::f32::consts::PI;

use embassy_time::{Duration, Instant};

use crate::color::{Brightness, Color, LedFrame};
use crate::config::ButtonConfig;
use crate::machine::since;
use crate::mode::{Mode, ModeState};
use crate::power_logic::led_fade_level;

pub struct Animator<'a> {
    config: &'a ButtonConfig,
}

impl<'a> Animator<'a> {
    pub const fn new(config: &'a ButtonConfig) -> Self {
        Self { config }
    }

    /// Compute this tick's pixel.
    pub fn render(&self, state: &ModeState, now: Instant, usb_present: bool) -> LedFrame {
        let palette = &self.config.palette;
        let timings = &self.config.timings;

        match state.mode {
            Mode::Advertising => self.breathe(palette.advertising, state.mode_entered_at, now),
            Mode::ConnectedIdle => {
                let level = self.breathe_level(since(state.mode_entered_at, now));
                if usb_present {
                    return self.frame(palette.idle, level);
                }
                let faded = led_fade_level(
                    level.level(),
                    since(state.last_activity_at, now),
                    timings.led_idle_timeout,
                    timings.led_fade,
                );
                self.frame(palette.idle, Brightness::new(faded))
            }
            Mode::ActivePress => self.frame(palette.active, Brightness::FULL),
            Mode::BondClearing => {
                let elapsed = since(state.mode_entered_at, now);
                if elapsed >= timings.bond_clear_flash {
                    // Flash is over; show what advertising will show.
                    let end = state.mode_entered_at + timings.bond_clear_flash;
                    return self.breathe(palette.advertising, end, now);
                }
                let toggle = timings.bond_clear_flash_period.as_millis().max(1);
                if (elapsed.as_millis() / toggle) % 2 == 0 {
                    self.frame(palette.clear, Brightness::FULL)
                } else {
                    LedFrame::OFF
                }
            }
        }
    }

    /// One-shot boot flash, shown before the first tick.
    ///
    /// Returns `None` once the flash window has passed.
    pub fn boot_frame(&self, started_at: Instant, now: Instant) -> Option<LedFrame> {
        if since(started_at, now) < self.config.timings.boot_flash {
            Some(self.frame(self.config.palette.boot, Brightness::FULL))
        } else {
            None
        }
    }

    /// Breathe envelope level `elapsed` into the cycle.
    ///
    /// Raised cosine from `min` (phase 0) to `max` (half period) and back.
    pub fn breathe_level(&self, elapsed: Duration) -> Brightness {
        let range = self.config.breathe;
        let period = self.config.timings.breathe_period.as_millis();
        if period == 0 {
            return range.max;
        }

        let phase = (elapsed.as_millis() % period) as f32 / period as f32;
        let swing = (1.0 - libm::cosf(2.0 * PI * phase)) / 2.0;
        let min = f32::from(range.min.level());
        let max = f32::from(range.max.level());
        Brightness::from_f32(min + (max - min) * swing)
    }

    fn breathe(&self, color: Color, anchor: Instant, now: Instant) -> LedFrame {
        self.frame(color, self.breathe_level(since(anchor, now)))
    }

    fn frame(&self, color: Color, level: Brightness) -> LedFrame {
        LedFrame::from_color(color, level, self.config.brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ButtonConfig = ButtonConfig::DEFAULT;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn state(mode: Mode, entered: u64, activity: u64) -> ModeState {
        ModeState {
            mode,
            mode_entered_at: at(entered),
            last_activity_at: at(activity),
            ..ModeState::boot(at(0))
        }
    }

    fn expected(color: Color, level: u8) -> LedFrame {
        LedFrame::from_color(color, Brightness::new(level), CONFIG.brightness)
    }

    #[test]
    fn breathe_starts_at_min_on_every_mode_entry() {
        let animator = Animator::new(&CONFIG);
        for entered in [0, 1_234, 1_500, 77_777] {
            let adv = state(Mode::Advertising, entered, entered);
            assert_eq!(
                animator.render(&adv, at(entered), false),
                expected(CONFIG.palette.advertising, CONFIG.breathe.min.level())
            );
            let idle = state(Mode::ConnectedIdle, entered, entered);
            assert_eq!(
                animator.render(&idle, at(entered), false),
                expected(CONFIG.palette.idle, CONFIG.breathe.min.level())
            );
        }
    }

    #[test]
    fn breathe_peaks_at_half_period_and_repeats() {
        let animator = Animator::new(&CONFIG);
        assert_eq!(animator.breathe_level(Duration::from_millis(0)), CONFIG.breathe.min);
        assert_eq!(animator.breathe_level(Duration::from_millis(1_500)), CONFIG.breathe.max);
        assert_eq!(animator.breathe_level(Duration::from_millis(3_000)), CONFIG.breathe.min);
        assert_eq!(
            animator.breathe_level(Duration::from_millis(700)),
            animator.breathe_level(Duration::from_millis(3_700))
        );
    }

    #[test]
    fn breathe_stays_within_bounds() {
        let animator = Animator::new(&CONFIG);
        for ms in (0..3_000).step_by(7) {
            let level = animator.breathe_level(Duration::from_millis(ms));
            assert!(level >= CONFIG.breathe.min && level <= CONFIG.breathe.max);
        }
    }

    #[test]
    fn active_press_is_solid_full_brightness() {
        let animator = Animator::new(&CONFIG);
        let pressed = state(Mode::ActivePress, 100, 100);
        let solid = expected(CONFIG.palette.active, 255);
        for t in [100, 101, 900, 4_000] {
            assert_eq!(animator.render(&pressed, at(t), false), solid);
        }
        assert_eq!(solid, LedFrame { red: 80, green: 0, blue: 0 });
    }

    #[test]
    fn bond_clear_flash_toggles_each_period() {
        let animator = Animator::new(&CONFIG);
        let clearing = state(Mode::BondClearing, 1_000, 1_000);
        let on = expected(CONFIG.palette.clear, 255);
        assert_eq!(animator.render(&clearing, at(1_000), true), on);
        assert_eq!(animator.render(&clearing, at(1_099), true), on);
        assert_eq!(animator.render(&clearing, at(1_100), true), LedFrame::OFF);
        assert_eq!(animator.render(&clearing, at(1_200), true), on);
        assert_eq!(animator.render(&clearing, at(3_999), true), LedFrame::OFF);
    }

    #[test]
    fn bond_clear_reverts_to_advertising_after_window() {
        let animator = Animator::new(&CONFIG);
        let clearing = state(Mode::BondClearing, 1_000, 1_000);
        assert_eq!(
            animator.render(&clearing, at(4_000), false),
            expected(CONFIG.palette.advertising, CONFIG.breathe.min.level())
        );
        assert_eq!(
            animator.render(&clearing, at(5_500), false),
            expected(CONFIG.palette.advertising, CONFIG.breathe.max.level())
        );
    }

    #[test]
    fn idle_fades_out_on_battery() {
        let animator = Animator::new(&CONFIG);
        let idle = state(Mode::ConnectedIdle, 0, 0);
        // 31.5 s: breathe at peak (180), 1.5 s into a 2 s fade → 45.
        assert_eq!(
            animator.render(&idle, at(31_500), false),
            expected(CONFIG.palette.idle, 45)
        );
        assert_eq!(animator.render(&idle, at(32_000), false), LedFrame::OFF);
        assert_eq!(animator.render(&idle, at(600_000), false), LedFrame::OFF);
    }

    #[test]
    fn idle_never_fades_on_usb_power() {
        let animator = Animator::new(&CONFIG);
        let idle = state(Mode::ConnectedIdle, 0, 0);
        assert_eq!(
            animator.render(&idle, at(31_500), true),
            expected(CONFIG.palette.idle, CONFIG.breathe.max.level())
        );
    }

    #[test]
    fn activity_restores_idle_brightness() {
        let animator = Animator::new(&CONFIG);
        let idle = state(Mode::ConnectedIdle, 0, 30_000);
        assert_eq!(
            animator.render(&idle, at(31_500), false),
            expected(CONFIG.palette.idle, CONFIG.breathe.max.level())
        );
    }

    #[test]
    fn boot_flash_lasts_its_window() {
        let animator = Animator::new(&CONFIG);
        let flash = Some(expected(CONFIG.palette.boot, 255));
        assert_eq!(animator.boot_frame(at(0), at(0)), flash);
        assert_eq!(animator.boot_frame(at(0), at(499)), flash);
        assert_eq!(animator.boot_frame(at(0), at(500)), None);
    }
}
