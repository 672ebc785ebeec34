//! Chirp Button firmware entry point.
//!
//! Boot sequence:
//! 1. Bring up Embassy (interrupt priorities compatible with the SoftDevice)
//! 2. Enable the SoftDevice and register the HID service
//! 3. Load the bond from flash and start the BLE and storage tasks
//! 4. Flash the pixel once, then run the control loop every `TICK_MS`
//!
//! Each tick: sample the switch, run the state machine, act on its outputs
//! (HID report, bond erase, deep sleep), render the pixel.

#![no_std]
#![no_main]

mod ble;
mod button;
mod error;
mod led;
mod power;
mod storage;

use core::mem;

use chirp_button::config::{self, ButtonConfig};
use chirp_button::hid::KeyboardReport;
use chirp_button::{Animator, ModeState, StateMachine, TickInput};
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_time::{Duration, Instant, Ticker};
use nrf_softdevice::{raw, Flash, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::bonder::Bonder;
use crate::button::PttButton;
use crate::led::{StatusLed, Ws2812};
use crate::storage::BondStore;

static CONFIG: ButtonConfig = ButtonConfig::DEFAULT;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run_with_callback(power::on_soc_event).await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static ble::Server, bonder: &'static Bonder) -> ! {
    ble::ble_task(sd, server, bonder).await
}

#[embassy_executor::task]
async fn storage_task(store: BondStore<Flash>) -> ! {
    storage::storage_task(store).await
}

fn softdevice_config() -> nrf_softdevice::Config {
    let name = config::BLE_DEVICE_NAME.as_bytes();
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 64 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: name.as_ptr() as _,
            current_len: name.len() as u16,
            max_len: name.len() as u16,
            // SAFETY: all-zero is "no access" for the write permission.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    info!("Chirp Button starting up");
    info!("HID action: {:?}", CONFIG.hid);

    // - SoftDevice + GATT ---------------
    let sd = Softdevice::enable(&softdevice_config());
    static SERVER: StaticCell<ble::Server> = StaticCell::new();
    let server: &'static ble::Server = SERVER.init(unwrap!(ble::Server::new(sd)));
    unwrap!(spawner.spawn(softdevice_task(sd)));
    power::init_usb_detection();

    // - Bond storage ---------------
    let mut store = BondStore::new(Flash::take(sd));
    let bonder = ble::bonder::bonder(store.load().await);
    unwrap!(spawner.spawn(storage_task(store)));
    unwrap!(spawner.spawn(ble_task(sd, server, bonder)));

    // - Board I/O (XIAO nRF52840: A2 = P0.28, A3 = P0.29) ---------------
    const _: () = assert!(config::NEO_PIN == 29);
    const _: () = assert!(config::PTT_PIN == 28);
    let mut led = StatusLed::new(unwrap!(Ws2812::new(p.PWM0, p.P0_29)));
    let ptt = Input::new(p.P0_28, Pull::Up);
    let mut button = PttButton::new(ptt, CONFIG.timings.debounce, Instant::now());

    let machine = StateMachine::new(&CONFIG);
    let animator = Animator::new(&CONFIG);
    let mut ticker = Ticker::every(Duration::from_millis(config::TICK_MS));

    // - Boot flash ---------------
    let boot_started = Instant::now();
    while let Some(frame) = animator.boot_frame(boot_started, Instant::now()) {
        led.show(frame);
        ticker.next().await;
    }

    // - Control loop ---------------
    let mut state = ModeState::boot(Instant::now());
    info!("Mode: {:?}", state.mode);

    loop {
        let now = Instant::now();
        let input = TickInput {
            sample: button.sample(now),
            connected: ble::is_connected(),
            usb_present: power::usb_present(),
            now,
        };

        let step = machine.transition(&state, &input);
        if step.state.mode != state.mode {
            info!("Mode: {:?} -> {:?}", state.mode, step.state.mode);
        }
        if let Some(event) = step.hid {
            ble::send_report(KeyboardReport::for_event(CONFIG.hid, event));
        }
        if step.erase_bonds {
            info!("Bond clear requested");
            ble::request_bond_erase(step.state.key_held);
        }
        state = step.state;

        if step.power.enter_deep_sleep {
            info!("Idle timeout in {:?}, going to sleep", state.mode);
            led.off();
            power::enter_deep_sleep(config::PTT_PIN, state.pressed);
        }

        led.show(animator.render(&state, now, input.usb_present));
        ticker.next().await;
    }
}
