//! End-to-end scenarios for the host-testable core.
//!
//! A small rig plays the role of the firmware's tick loop: a virtual clock
//! advancing by `TICK_MS`, the debouncer, the state machine and the
//! animator, with the HID reports, bond-erase requests and sleep requests
//! recorded instead of sent to hardware. After a bond clear the rig drops
//! the link the way the BLE task does: once no key-up is owed.

use chirp_button::config::{
    ButtonConfig, HidAction, ADV_SLEEP_TIMEOUT_MS, BOND_CLEAR_FLASH_MS, BOND_CLEAR_HOLD_MS,
    DEBOUNCE_MS, LED_FADE_DURATION_MS, LED_IDLE_TIMEOUT_MS, SLEEP_TIMEOUT_MS, TICK_MS,
};
use chirp_button::debounce::Debouncer;
use chirp_button::hid::KeyboardReport;
use chirp_button::link::EraseHandoff;
use chirp_button::{Animator, Brightness, HidEvent, LedFrame, Mode, ModeState, StateMachine, TickInput};
use embassy_time::Instant;

const CONFIG: ButtonConfig = ButtonConfig::DEFAULT;

struct Rig {
    now_ms: u64,
    debouncer: Debouncer,
    state: ModeState,
    pin_pressed: bool,
    connected: bool,
    usb_present: bool,
    reports: Vec<(u64, [u8; 8])>,
    erase_requests: Vec<u64>,
    handoff: Option<EraseHandoff>,
    sleep_requested_at: Option<u64>,
}

impl Rig {
    fn boot() -> Self {
        let now = Instant::from_millis(0);
        Self {
            now_ms: 0,
            debouncer: Debouncer::new(CONFIG.timings.debounce, now),
            state: ModeState::boot(now),
            pin_pressed: false,
            connected: false,
            usb_present: false,
            reports: Vec::new(),
            erase_requests: Vec::new(),
            handoff: None,
            sleep_requested_at: None,
        }
    }

    fn tick(&mut self) {
        self.now_ms += TICK_MS;
        let now = Instant::from_millis(self.now_ms);
        let input = TickInput {
            sample: self.debouncer.update(self.pin_pressed, now),
            connected: self.connected,
            usb_present: self.usb_present,
            now,
        };

        let step = StateMachine::new(&CONFIG).transition(&self.state, &input);
        if step.erase_bonds {
            self.erase_requests.push(self.now_ms);
            if self.connected {
                self.handoff = Some(EraseHandoff::new(step.state.key_held));
            }
        }
        if let Some(event) = step.hid {
            let report = KeyboardReport::for_event(CONFIG.hid, event);
            self.reports.push((self.now_ms, report.to_bytes()));
            if let Some(handoff) = self.handoff.as_mut() {
                handoff.on_report(&report);
            }
        }
        if self.handoff.is_some_and(|h| h.may_disconnect()) {
            self.handoff = None;
            self.connected = false;
        }
        if step.power.enter_deep_sleep && self.sleep_requested_at.is_none() {
            self.sleep_requested_at = Some(self.now_ms);
        }
        self.state = step.state;
    }

    /// Tick until the clock reads `ms`.
    fn run_until(&mut self, ms: u64) {
        while self.now_ms < ms {
            self.tick();
        }
    }

    fn frame(&self) -> LedFrame {
        Animator::new(&CONFIG).render(&self.state, Instant::from_millis(self.now_ms), self.usb_present)
    }
}

fn key_down_bytes() -> [u8; 8] {
    match CONFIG.hid {
        HidAction::Key(code) => [0, 0, code, 0, 0, 0, 0, 0],
        HidAction::Modifier(bits) => [bits, 0, 0, 0, 0, 0, 0, 0],
    }
}

const KEY_UP_BYTES: [u8; 8] = [0; 8];

/// Ticks from a raw edge to the debounced edge.
const SETTLE_MS: u64 = TICK_MS + DEBOUNCE_MS;

#[test]
fn boot_connect_press_release() {
    let mut rig = Rig::boot();
    assert_eq!(rig.state.mode, Mode::Advertising);

    rig.run_until(40);
    rig.connected = true;
    rig.tick();
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);

    rig.run_until(100);
    rig.pin_pressed = true;
    rig.run_until(100 + SETTLE_MS);
    assert_eq!(rig.state.mode, Mode::ActivePress);
    assert_eq!(
        rig.frame(),
        LedFrame::from_color(CONFIG.palette.active, Brightness::FULL, CONFIG.brightness)
    );

    rig.run_until(250);
    rig.pin_pressed = false;
    rig.run_until(250 + SETTLE_MS);
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);

    assert_eq!(
        rig.reports,
        vec![(100 + SETTLE_MS, key_down_bytes()), (250 + SETTLE_MS, KEY_UP_BYTES)]
    );
    assert!(rig.erase_requests.is_empty());
    assert_eq!(rig.sleep_requested_at, None);
}

#[test]
fn bounce_shorter_than_debounce_sends_nothing() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.run_until(100);

    for _ in 0..10 {
        rig.pin_pressed = !rig.pin_pressed;
        rig.tick();
    }
    rig.pin_pressed = false;
    rig.run_until(400);

    assert!(rig.reports.is_empty());
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);
    // Still measured from the connect on the first tick.
    assert_eq!(rig.state.last_activity_at, Instant::from_millis(TICK_MS));
}

#[test]
fn connected_idle_sleeps_exactly_at_timeout() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.tick();
    let connected_at = rig.now_ms;

    rig.run_until(connected_at + SLEEP_TIMEOUT_MS - TICK_MS);
    assert_eq!(rig.sleep_requested_at, None);

    rig.tick();
    assert_eq!(rig.sleep_requested_at, Some(connected_at + SLEEP_TIMEOUT_MS));
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);
}

#[test]
fn advertising_sleeps_after_its_own_timeout() {
    let mut rig = Rig::boot();

    rig.run_until(ADV_SLEEP_TIMEOUT_MS - TICK_MS);
    assert_eq!(rig.sleep_requested_at, None);

    rig.tick();
    assert_eq!(rig.sleep_requested_at, Some(ADV_SLEEP_TIMEOUT_MS));
}

#[test]
fn usb_power_keeps_the_button_awake() {
    let mut rig = Rig::boot();
    rig.usb_present = true;
    rig.run_until(ADV_SLEEP_TIMEOUT_MS + 1_000);

    rig.connected = true;
    rig.run_until(ADV_SLEEP_TIMEOUT_MS + SLEEP_TIMEOUT_MS + 1_000);

    assert_eq!(rig.sleep_requested_at, None);
    assert!(!rig.frame().is_off());
}

#[test]
fn idle_pixel_fades_out_on_battery() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.tick();
    let connected_at = rig.now_ms;

    rig.run_until(connected_at + LED_IDLE_TIMEOUT_MS - TICK_MS);
    let before = rig.frame();
    assert_eq!(before.red, 0);
    assert_eq!(before.blue, 0);

    rig.run_until(connected_at + LED_IDLE_TIMEOUT_MS + LED_FADE_DURATION_MS);
    assert!(rig.frame().is_off());

    // A press wakes it straight back up.
    rig.pin_pressed = true;
    rig.run_until(rig.now_ms + SETTLE_MS);
    assert!(!rig.frame().is_off());
}

#[test]
fn long_hold_while_connected_clears_bonds_and_still_releases_key() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.run_until(100);

    rig.pin_pressed = true;
    let pressed_at = 100 + SETTLE_MS;
    rig.run_until(pressed_at + BOND_CLEAR_HOLD_MS - TICK_MS);
    assert_eq!(rig.state.mode, Mode::ActivePress);
    assert!(rig.erase_requests.is_empty());

    rig.tick();
    let cleared_at = pressed_at + BOND_CLEAR_HOLD_MS;
    assert_eq!(rig.state.mode, Mode::BondClearing);
    assert_eq!(rig.erase_requests, vec![cleared_at]);
    assert_eq!(
        rig.frame(),
        LedFrame::from_color(CONFIG.palette.clear, Brightness::FULL, CONFIG.brightness)
    );

    // The host keeps the link until it has seen the key-up.
    rig.run_until(cleared_at + 500);
    assert!(rig.connected);
    rig.pin_pressed = false;
    let released_at = cleared_at + 500 + SETTLE_MS;
    rig.run_until(released_at);
    assert_eq!(rig.state.mode, Mode::BondClearing);
    assert_eq!(
        rig.reports,
        vec![(pressed_at, key_down_bytes()), (released_at, KEY_UP_BYTES)]
    );
    assert!(!rig.connected);
    assert!(!rig.state.key_held);

    // Link gone, the flash still runs to the end.
    rig.run_until(cleared_at + BOND_CLEAR_FLASH_MS - TICK_MS);
    assert_eq!(rig.state.mode, Mode::BondClearing);
    rig.tick();
    assert_eq!(rig.state.mode, Mode::Advertising);
    assert_eq!(rig.erase_requests.len(), 1);
    assert_eq!(rig.reports.len(), 2);
}

#[test]
fn hold_past_the_flash_keeps_link_until_release() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.run_until(100);

    rig.pin_pressed = true;
    let cleared_at = 100 + SETTLE_MS + BOND_CLEAR_HOLD_MS;
    rig.run_until(cleared_at + BOND_CLEAR_FLASH_MS + 1_000);
    assert_eq!(rig.erase_requests, vec![cleared_at]);
    assert!(rig.connected);
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);
    assert!(rig.state.key_held);

    let released_at = rig.now_ms + SETTLE_MS;
    rig.pin_pressed = false;
    rig.run_until(released_at);
    assert_eq!(rig.reports.last(), Some(&(released_at, KEY_UP_BYTES)));
    assert!(!rig.connected);

    rig.tick();
    assert_eq!(rig.state.mode, Mode::Advertising);
}

#[test]
fn disconnect_mid_press_owes_the_host_nothing() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.run_until(100);

    rig.pin_pressed = true;
    rig.run_until(100 + SETTLE_MS);
    assert_eq!(rig.state.mode, Mode::ActivePress);

    rig.connected = false;
    rig.tick();
    assert_eq!(rig.state.mode, Mode::Advertising);
    assert!(!rig.state.key_held);

    // Released before the hold threshold: just a quiet return to idle on
    // reconnect, no stray key-up.
    rig.pin_pressed = false;
    rig.run_until(1_000);
    rig.connected = true;
    rig.run_until(1_100);
    assert_eq!(rig.state.mode, Mode::ConnectedIdle);
    assert_eq!(rig.reports, vec![(100 + SETTLE_MS, key_down_bytes())]);
}

#[test]
fn single_press_is_one_report_pair() {
    let mut rig = Rig::boot();
    rig.connected = true;
    rig.run_until(100);

    rig.pin_pressed = true;
    rig.run_until(2_000);
    rig.pin_pressed = false;
    rig.run_until(3_000);

    let events: Vec<_> = rig.reports.iter().map(|(_, bytes)| *bytes).collect();
    assert_eq!(events, vec![key_down_bytes(), KEY_UP_BYTES]);
    assert_eq!(
        KeyboardReport::for_event(CONFIG.hid, HidEvent::KeyUp).to_bytes(),
        KEY_UP_BYTES
    );
}
