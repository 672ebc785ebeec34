//! Link teardown after a bond clear.
//!
//! Clearing bonds drops the host, but a key-down already delivered must be
//! matched by a key-up first or the host sees a stuck key. The BLE task
//! feeds every report it delivers through [`EraseHandoff`] and disconnects
//! once nothing is owed.

use crate::hid::KeyboardReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EraseHandoff {
    key_owed: bool,
}

impl EraseHandoff {
    /// `key_owed`: the host last saw a key-down.
    pub const fn new(key_owed: bool) -> Self {
        Self { key_owed }
    }

    /// Record a report that reached the host.
    pub fn on_report(&mut self, report: &KeyboardReport) {
        self.key_owed = !report.is_empty();
    }

    pub fn may_disconnect(&self) -> bool {
        !self.key_owed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonConfig;
    use crate::mode::HidEvent;

    const HID: crate::config::HidAction = ButtonConfig::DEFAULT.hid;

    #[test]
    fn nothing_owed_drops_at_once() {
        assert!(EraseHandoff::new(false).may_disconnect());
    }

    #[test]
    fn waits_for_the_key_up() {
        let mut handoff = EraseHandoff::new(true);
        assert!(!handoff.may_disconnect());

        handoff.on_report(&KeyboardReport::for_event(HID, HidEvent::KeyDown));
        assert!(!handoff.may_disconnect());

        handoff.on_report(&KeyboardReport::for_event(HID, HidEvent::KeyUp));
        assert!(handoff.may_disconnect());
    }
}
