//! Single-host bonding.
//!
//! The SoftDevice calls into [`Bonder`] synchronously from its event
//! handler; flash writes are handed off to the storage task.

use core::cell::RefCell;

use chirp_button::bond::{StoredBond, SYS_ATTRS_CAPACITY};
use defmt::{info, warn};
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    Address, AddressType, Connection, EncryptionInfo, IdentityKey, IdentityResolutionKey,
    MasterId, SecurityMode,
};
use nrf_softdevice::raw;
use static_cell::StaticCell;

use crate::storage::{StorageCommand, STORAGE_COMMANDS};

pub struct Bonder {
    bond: RefCell<Option<StoredBond>>,
}

impl Bonder {
    fn new(bond: Option<StoredBond>) -> Self {
        Self {
            bond: RefCell::new(bond),
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.bond.borrow().is_some()
    }

    /// Forget the bonded host, in RAM and in flash.
    pub fn clear(&self) {
        self.bond.replace(None);
        persist(StorageCommand::Erase);
    }

    fn matches(&self, conn: &Connection) -> bool {
        self.bond
            .borrow()
            .as_ref()
            .is_some_and(|bond| identity_key(bond).is_match(conn.peer_address()))
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("BLE: bonded with {}", peer_id.addr);
        let bond = StoredBond {
            ediv: master_id.ediv,
            rand: master_id.rand,
            ltk: key.ltk,
            ltk_flags: key.flags,
            irk: peer_id.irk.as_raw().irk,
            addr: peer_id.addr.bytes(),
            addr_type: address_type_code(peer_id.addr.address_type()),
            sys_attrs: heapless::Vec::new(),
        };
        self.bond.replace(Some(bond.clone()));
        persist(StorageCommand::Save(bond));
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.bond.borrow().as_ref().and_then(|bond| {
            let stored = MasterId {
                ediv: bond.ediv,
                rand: bond.rand,
            };
            (stored == master_id).then_some(EncryptionInfo {
                ltk: bond.ltk,
                flags: bond.ltk_flags,
            })
        })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE: security mode updated: {}", mode);
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        if !self.matches(conn) {
            return;
        }

        let mut buf = [0u8; SYS_ATTRS_CAPACITY];
        let len = match gatt_server::get_sys_attrs(conn, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                warn!("BLE: reading sys attrs failed: {:?}", e);
                return;
            }
        };

        let mut slot = self.bond.borrow_mut();
        let Some(bond) = slot.as_mut() else {
            return;
        };
        if bond.sys_attrs.as_slice() == &buf[..len] {
            return;
        }
        if bond.set_sys_attrs(&buf[..len]) {
            persist(StorageCommand::Save(bond.clone()));
        } else {
            warn!("BLE: sys attrs too large ({} bytes)", len);
        }
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let bond = self.bond.borrow();
        let attrs = bond
            .as_ref()
            .filter(|_| self.matches(conn))
            .map(|bond| bond.sys_attrs.as_slice())
            .filter(|attrs| !attrs.is_empty());

        if let Err(e) = gatt_server::set_sys_attrs(conn, attrs) {
            warn!("BLE: restoring sys attrs failed: {:?}", e);
        }
    }
}

fn persist(command: StorageCommand) {
    if STORAGE_COMMANDS.try_send(command).is_err() {
        warn!("BLE: storage queue full, bond change not persisted");
    }
}

fn identity_key(bond: &StoredBond) -> IdentityKey {
    IdentityKey {
        irk: IdentityResolutionKey::from_raw(raw::ble_gap_irk_t { irk: bond.irk }),
        addr: Address::new(address_type(bond.addr_type), bond.addr),
    }
}

fn address_type_code(kind: AddressType) -> u8 {
    match kind {
        AddressType::Public => 0,
        AddressType::RandomStatic => 1,
        AddressType::RandomPrivateResolvable => 2,
        AddressType::RandomPrivateNonResolvable => 3,
        AddressType::Anonymous => 4,
    }
}

fn address_type(code: u8) -> AddressType {
    match code {
        0 => AddressType::Public,
        2 => AddressType::RandomPrivateResolvable,
        3 => AddressType::RandomPrivateNonResolvable,
        4 => AddressType::Anonymous,
        _ => AddressType::RandomStatic,
    }
}

/// Create the bonder, seeded with the record loaded from flash.
pub fn bonder(stored: Option<StoredBond>) -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new(stored))
}
