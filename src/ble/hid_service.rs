//! HID-over-GATT (HOGP) service in peripheral role.
//!
//! Attribute table, in registration order:
//!
//! | Characteristic      | UUID   | Properties            |
//! |---------------------|--------|-----------------------|
//! | HID Information     | 0x2A4A | read                  |
//! | Report Map          | 0x2A4B | read                  |
//! | HID Control Point   | 0x2A4C | write without resp.   |
//! | Protocol Mode       | 0x2A4E | read, write w/o resp. |
//! | Report (input)      | 0x2A4D | read, notify          |
//! | Report (output)     | 0x2A4D | read, write, w/o resp.|
//!
//! Every attribute requires an encrypted link (Just Works), which is what
//! makes the host pair and bond on first connect.

use chirp_button::hid::{
    KeyboardReport, HID_INFORMATION, INPUT_REPORT_REFERENCE, KEYBOARD_REPORT_MAP,
    KEYBOARD_REPORT_SIZE, OUTPUT_REPORT_REFERENCE,
};
use defmt::{debug, info};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError};
use nrf_softdevice::ble::{Connection, SecurityMode, Uuid};
use nrf_softdevice::Softdevice;

use crate::error::BleError;

// Standard HID-over-GATT UUIDs (Bluetooth SIG assigned).

/// HID Service UUID: 0x1812
pub const HID_SERVICE: Uuid = Uuid::new_16(0x1812);
/// HID Information: 0x2A4A
const HID_INFO: Uuid = Uuid::new_16(0x2A4A);
/// Report Map: 0x2A4B
const REPORT_MAP: Uuid = Uuid::new_16(0x2A4B);
/// HID Control Point: 0x2A4C
const HID_CONTROL_POINT: Uuid = Uuid::new_16(0x2A4C);
/// Report: 0x2A4D
const HID_REPORT: Uuid = Uuid::new_16(0x2A4D);
/// Protocol Mode: 0x2A4E
const PROTOCOL_MODE: Uuid = Uuid::new_16(0x2A4E);
/// Report Reference descriptor: 0x2908
const REPORT_REFERENCE: Uuid = Uuid::new_16(0x2908);

/// Protocol Mode value for report protocol.
const REPORT_PROTOCOL: u8 = 0x01;

pub struct HidService {
    input_report: u16,
    input_report_cccd: u16,
    output_report: u16,
    control_point: u16,
    protocol_mode: u16,
}

impl HidService {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut builder = ServiceBuilder::new(sd, HID_SERVICE)?;

        let hid_info = builder.add_characteristic(
            HID_INFO,
            Attribute::new(HID_INFORMATION).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read()),
        )?;
        let _hid_info = hid_info.build();

        let report_map = builder.add_characteristic(
            REPORT_MAP,
            Attribute::new(KEYBOARD_REPORT_MAP).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read()),
        )?;
        let _report_map = report_map.build();

        let control_point = builder.add_characteristic(
            HID_CONTROL_POINT,
            Attribute::new([0u8]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().write_without_response()),
        )?;
        let control_point = control_point.build();

        let protocol_mode = builder.add_characteristic(
            PROTOCOL_MODE,
            Attribute::new([REPORT_PROTOCOL]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read().write_without_response()),
        )?;
        let protocol_mode = protocol_mode.build();

        let mut input = builder.add_characteristic(
            HID_REPORT,
            Attribute::new([0u8; KEYBOARD_REPORT_SIZE]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read().notify()),
        )?;
        input.add_descriptor(
            REPORT_REFERENCE,
            Attribute::new(INPUT_REPORT_REFERENCE).security(SecurityMode::JustWorks),
        )?;
        let input = input.build();

        let mut output = builder.add_characteristic(
            HID_REPORT,
            Attribute::new([0u8]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read().write().write_without_response()),
        )?;
        output.add_descriptor(
            REPORT_REFERENCE,
            Attribute::new(OUTPUT_REPORT_REFERENCE).security(SecurityMode::JustWorks),
        )?;
        let output = output.build();

        let _service = builder.build();

        Ok(Self {
            input_report: input.value_handle,
            input_report_cccd: input.cccd_handle,
            output_report: output.value_handle,
            control_point: control_point.value_handle,
            protocol_mode: protocol_mode.value_handle,
        })
    }

    /// Notify the host of a new input report.
    pub fn send_report(&self, conn: &Connection, report: &KeyboardReport) -> Result<(), BleError> {
        gatt_server::notify_value(conn, self.input_report, &report.to_bytes())
            .map_err(|_| BleError::NotifyFailed)
    }

    /// Host writes. The button has no LEDs to mirror and only speaks
    /// report protocol, so these are logged and otherwise ignored.
    pub fn on_write(&self, handle: u16, data: &[u8]) {
        if handle == self.input_report_cccd {
            info!("HID: input notifications {}", data.first().map_or(false, |&b| b & 0x01 != 0));
        } else if handle == self.output_report {
            debug!("HID: host LED state {:02x}", data);
        } else if handle == self.control_point {
            debug!("HID: control point {:02x}", data);
        } else if handle == self.protocol_mode {
            debug!("HID: protocol mode {:02x}", data);
        }
    }
}
