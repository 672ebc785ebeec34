//! Persistent storage for the bonded host.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` crate,
//! with the SoftDevice's flash driver underneath so writes are scheduled
//! around radio activity.
//!
//! Storage layout:
//!   - A single key-value item holding the serialized [`StoredBond`].
//!   - The region is the `BONDS` block in `memory.x`; `sequential-storage`
//!     handles wear levelling and GC inside it.
//!   - Clearing bonds erases the whole region.

use chirp_button::bond::{StoredBond, MAX_RECORD_SIZE};
use chirp_button::config::{BOND_FLASH_END, BOND_FLASH_START};
use defmt::{debug, error, info};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;

use crate::error::Error;

/// Key for the bond record in the map storage.
const KEY_BOND: u8 = 0x01;

/// Scratch space for one map item (key + record, rounded up).
const ITEM_BUFFER_SIZE: usize = 128;

const _: () = assert!(MAX_RECORD_SIZE + 8 <= ITEM_BUFFER_SIZE);

/// Work for the storage task. Flash access is async, while the
/// SoftDevice's security callbacks are not, so they queue it here.
#[derive(Clone)]
pub enum StorageCommand {
    /// Write (or overwrite) the bond record.
    Save(StoredBond),
    /// Forget the bonded host.
    Erase,
}

/// Queue into the storage task.
pub static STORAGE_COMMANDS: Channel<CriticalSectionRawMutex, StorageCommand, 2> =
    Channel::new();

/// Flash-backed bond record.
pub struct BondStore<F> {
    flash: F,
}

impl<F: NorFlash> BondStore<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Read the bond record, if one was ever saved.
    ///
    /// Unreadable or corrupt records are treated as "no bond"; the host
    /// simply pairs again.
    pub async fn load(&mut self) -> Option<StoredBond> {
        let mut buf = [0u8; ITEM_BUFFER_SIZE];

        match sequential_storage::map::fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            BOND_FLASH_START..BOND_FLASH_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_BOND,
        )
        .await
        {
            Ok(Some(data)) => {
                let bond = StoredBond::deserialize(data);
                if bond.is_some() {
                    info!("Storage: bond loaded");
                } else {
                    error!("Storage: bond record is corrupt ({} bytes)", data.len());
                }
                bond
            }
            Ok(None) => {
                info!("Storage: no bond in flash");
                None
            }
            Err(e) => {
                error!("Storage: flash read error: {:?}", defmt::Debug2Format(&e));
                None
            }
        }
    }

    /// Persist `bond`, replacing any previous record.
    pub async fn save(&mut self, bond: &StoredBond) -> Result<(), Error> {
        let mut record = [0u8; MAX_RECORD_SIZE];
        let len = bond.serialize(&mut record);
        if len == 0 {
            return Err(Error::BufferOverflow);
        }

        let mut buf = [0u8; ITEM_BUFFER_SIZE];
        let item = &record[..len];
        sequential_storage::map::store_item::<u8, &[u8], _>(
            &mut self.flash,
            BOND_FLASH_START..BOND_FLASH_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_BOND,
            &item,
        )
        .await
        .map_err(|e| {
            error!("Storage: flash write error: {:?}", defmt::Debug2Format(&e));
            Error::Storage
        })?;

        debug!("Storage: bond saved ({} bytes)", len);
        Ok(())
    }

    /// Wipe the bond region.
    pub async fn erase(&mut self) -> Result<(), Error> {
        sequential_storage::erase_all(&mut self.flash, BOND_FLASH_START..BOND_FLASH_END)
            .await
            .map_err(|e| {
                error!("Storage: flash erase error: {:?}", defmt::Debug2Format(&e));
                Error::Storage
            })?;

        info!("Storage: bonds erased");
        Ok(())
    }
}

/// Serve [`STORAGE_COMMANDS`] forever.
pub async fn storage_task<F: NorFlash>(mut store: BondStore<F>) -> ! {
    loop {
        let result = match STORAGE_COMMANDS.receive().await {
            StorageCommand::Save(bond) => store.save(&bond).await,
            StorageCommand::Erase => store.erase().await,
        };
        if let Err(e) = result {
            error!("Storage: command failed: {:?}", e);
        }
    }
}
