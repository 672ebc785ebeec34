//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertiser** - connectable undirected advertising as a keyboard
//!    (HID service UUID + keyboard appearance) until a host connects.
//! 2. **HID Service** - the HID-over-GATT attribute table and input report
//!    notifications ([`hid_service`]).
//! 3. **Bonder** - Just Works pairing with one persisted host ([`bonder`]).
//!
//! The control loop talks to the BLE task through the statics below: it
//! reads [`is_connected`], queues reports with [`send_report`] and asks for
//! a bond wipe with [`request_bond_erase`].

pub mod bonder;
pub mod hid_service;

use core::sync::atomic::{AtomicBool, Ordering};

use chirp_button::config;
use chirp_button::hid::KeyboardReport;
use chirp_button::link::EraseHandoff;
use defmt::{info, warn};
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::gatt_server::{self, WriteOp};
use nrf_softdevice::ble::{peripheral, Connection};
use nrf_softdevice::Softdevice;

use self::bonder::Bonder;
use self::hid_service::HidService;
use crate::error::{BleError, Error};

/// GAP appearance: HID keyboard (0x03C1), little endian.
const APPEARANCE_KEYBOARD: [u8; 2] = [0xC1, 0x03];

/// Back-off before advertising again after a SoftDevice error.
const ADVERTISE_RETRY: Duration = Duration::from_secs(1);

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Incomplete, &[ServiceUuid16::HUMAN_INTERFACE_DEVICE])
    .raw(AdvertisementDataType::APPEARANCE, &APPEARANCE_KEYBOARD)
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(config::BLE_DEVICE_NAME)
    .build();

/// A host is connected.
static CONNECTED: AtomicBool = AtomicBool::new(false);

/// Input reports waiting to be notified.
static REPORTS: Channel<CriticalSectionRawMutex, KeyboardReport, 4> = Channel::new();

/// Raised by the control loop when the user holds the button for a bond
/// clear. Carries whether the host is still owed a key-up.
static BOND_ERASE: Signal<CriticalSectionRawMutex, bool> = Signal::new();

pub fn is_connected() -> bool {
    CONNECTED.load(Ordering::Relaxed)
}

/// Queue a report for the connected host. Dropped when the queue is full.
pub fn send_report(report: KeyboardReport) {
    if REPORTS.try_send(report).is_err() {
        warn!("BLE: report queue full, dropping {:?}", report);
    }
}

pub fn request_bond_erase(key_owed: bool) {
    BOND_ERASE.signal(key_owed);
}

/// GATT server: just the HID service.
pub struct Server {
    pub hid: HidService,
}

impl Server {
    pub fn new(sd: &mut Softdevice) -> Result<Self, Error> {
        let hid = HidService::new(sd).map_err(|e| {
            warn!("BLE: HID service registration failed: {:?}", e);
            BleError::RegisterFailed
        })?;
        Ok(Self { hid })
    }
}

impl gatt_server::Server for Server {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        self.hid.on_write(handle, data);
        None
    }
}

/// Advertise, serve one host, repeat.
pub async fn ble_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    info!("BLE: ready, bonded={}", bonder.is_bonded());

    loop {
        let conn = match select(advertise(sd, bonder), BOND_ERASE.wait()).await {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                warn!("BLE: advertising failed: {:?}", e);
                Timer::after(ADVERTISE_RETRY).await;
                continue;
            }
            Either::Second(_) => {
                info!("BLE: clearing bonds while advertising");
                bonder.clear();
                continue;
            }
        };

        info!("BLE: connected to {}", conn.peer_address());
        REPORTS.clear();
        CONNECTED.store(true, Ordering::Relaxed);

        match select3(
            gatt_server::run(&conn, server, |_| {}),
            forward_reports(&conn, server),
            BOND_ERASE.wait(),
        )
        .await
        {
            Either3::First(reason) => info!("BLE: disconnected: {:?}", reason),
            Either3::Second(never) => match never {},
            Either3::Third(key_owed) => {
                info!("BLE: clearing bonds, key_owed={}", key_owed);
                bonder.clear();
                let handoff = EraseHandoff::new(key_owed);
                match select(gatt_server::run(&conn, server, |_| {}), settle_reports(&conn, server, handoff)).await {
                    Either::First(reason) => info!("BLE: disconnected: {:?}", reason),
                    Either::Second(()) => {
                        info!("BLE: dropping host");
                        if let Err(e) = conn.disconnect() {
                            warn!("BLE: disconnect failed: {:?}", e);
                        }
                    }
                }
            }
        }

        CONNECTED.store(false, Ordering::Relaxed);
    }
}

async fn advertise(sd: &Softdevice, bonder: &'static Bonder) -> Result<Connection, BleError> {
    let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
        adv_data: &ADV_DATA,
        scan_data: &SCAN_DATA,
    };
    let adv_config = peripheral::Config {
        interval: config::BLE_ADV_INTERVAL,
        ..Default::default()
    };

    info!("BLE: advertising as \"{}\"", config::BLE_DEVICE_NAME);
    let conn = peripheral::advertise_pairable(sd, adv, &adv_config, bonder)
        .await
        .map_err(|_| BleError::AdvertiseFailed)?;

    request_conn_params(&conn);
    Ok(conn)
}

/// Ask the host for a short interval so a press reaches it quickly.
fn request_conn_params(conn: &Connection) {
    let params = nrf_softdevice::raw::ble_gap_conn_params_t {
        min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
        max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
        slave_latency: config::BLE_SLAVE_LATENCY,
        conn_sup_timeout: config::BLE_SUP_TIMEOUT,
    };
    if let Err(e) = conn.set_conn_params(params) {
        warn!("BLE: connection parameter request failed: {:?}", e);
    }
}

async fn forward_reports(conn: &Connection, server: &Server) -> core::convert::Infallible {
    loop {
        let report = REPORTS.receive().await;
        deliver(conn, server, &report);
    }
}

/// Keep forwarding until the host is owed nothing.
async fn settle_reports(conn: &Connection, server: &Server, mut handoff: EraseHandoff) {
    while !handoff.may_disconnect() {
        let report = REPORTS.receive().await;
        if deliver(conn, server, &report) {
            handoff.on_report(&report);
        }
    }
}

fn deliver(conn: &Connection, server: &Server, report: &KeyboardReport) -> bool {
    match server.hid.send_report(conn, report) {
        Ok(()) => true,
        Err(e) => {
            warn!("BLE: report not delivered: {:?}", e);
            false
        }
    }
}
