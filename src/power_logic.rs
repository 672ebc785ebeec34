use embassy_time::Duration;

/// Decide whether an inactivity timer has run out and the device should
/// power down. Never true while running from USB power.
pub fn deep_sleep_due(elapsed: Duration, timeout: Duration, usb_present: bool) -> bool {
    if usb_present {
        return false;
    }

    elapsed >= timeout
}

/// Which switch edge wakes the chip from System OFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeEdge {
    /// Pin goes low.
    Press,
    /// Pin goes high. Used when the switch is already held at sleep time,
    /// since a low-level sense would wake the chip straight away.
    Release,
}

pub const fn wake_edge(pressed: bool) -> WakeEdge {
    if pressed {
        WakeEdge::Release
    } else {
        WakeEdge::Press
    }
}

/// Idle fade-out: `level` untouched until `idle_timeout`, then a linear
/// ramp to zero over `fade`, then dark.
pub fn led_fade_level(level: u8, idle: Duration, idle_timeout: Duration, fade: Duration) -> u8 {
    if idle < idle_timeout {
        return level;
    }

    let into_fade = (idle - idle_timeout).as_millis();
    let fade_ms = fade.as_millis();
    if into_fade >= fade_ms {
        return 0;
    }

    let remaining = fade_ms - into_fade;
    ((level as u64 * remaining) / fade_ms) as u8
}
