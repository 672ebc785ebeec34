//! Power plumbing - USB presence and System OFF.
//!
//! The decision of *when* to sleep lives in the state machine; this module
//! only supplies its inputs and carries out the result.
//!
//! nRF52840 power modes used here:
//! - System ON: advertising or connected (~0.5-3.5 mA)
//! - System OFF: deep sleep, wake on the PTT pin only (~0.4 µA)
//!
//! Waking from System OFF is a full reset, so there is no resume path.

use core::sync::atomic::{AtomicBool, Ordering};

use chirp_button::power_logic::{wake_edge, WakeEdge};
use defmt::{info, warn};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals::Sense;
use nrf_softdevice::{raw, SocEvent};

/// VBUS detected on the USB connector.
static USB_PRESENT: AtomicBool = AtomicBool::new(false);

/// USBREGSTATUS.VBUSDETECT
const VBUS_DETECT: u32 = 1 << 0;

/// Whether USB power is currently present.
pub fn usb_present() -> bool {
    USB_PRESENT.load(Ordering::Relaxed)
}

/// Enable the SoftDevice USB power events and latch the current VBUS state.
///
/// Must be called after the SoftDevice is enabled; while it runs the POWER
/// peripheral belongs to it.
pub fn init_usb_detection() {
    let mut status: u32 = 0;
    // SAFETY: plain SoftDevice SVCs, valid once the SoftDevice is enabled.
    let ret = unsafe {
        raw::sd_power_usbdetected_enable(1);
        raw::sd_power_usbremoved_enable(1);
        raw::sd_power_usbregstatus_get(&mut status)
    };
    if ret != raw::NRF_SUCCESS {
        warn!("Power: USB status query failed ({})", ret);
        return;
    }

    let present = status & VBUS_DETECT != 0;
    USB_PRESENT.store(present, Ordering::Relaxed);
    info!("Power: usb_present={}", present);
}

/// SoftDevice SoC event hook.
pub fn on_soc_event(event: SocEvent) {
    let present = match event {
        SocEvent::PowerUsbDetected => true,
        SocEvent::PowerUsbRemoved => false,
        _ => return,
    };
    if USB_PRESENT.swap(present, Ordering::Relaxed) != present {
        info!("Power: usb_present={}", present);
    }
}

/// Arm the PTT pin as the wake source and enter System OFF.
///
/// The pin is active-low with its pull-up already configured, so only the
/// SENSE field is touched. A switch still held at this point wakes the
/// chip on release instead.
pub fn enter_deep_sleep(ptt_pin: u8, pressed: bool) -> ! {
    let edge = wake_edge(pressed);
    info!("Power: entering System OFF (wake on P0.{} {:?})", ptt_pin, edge);

    let sense = match edge {
        WakeEdge::Press => Sense::LOW,
        WakeEdge::Release => Sense::HIGH,
    };
    pac::P0
        .pin_cnf(usize::from(ptt_pin))
        .modify(|w| w.set_sense(sense));

    // SAFETY: does not return on hardware. Under a debugger the chip only
    // emulates System OFF, hence the loop.
    unsafe {
        raw::sd_power_system_off();
    }
    loop {
        cortex_m::asm::wfe();
    }
}
