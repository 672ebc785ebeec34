//! Flash record for the single bonded host.
//!
//! The SoftDevice hands us the bonding keys and the GATT system attributes
//! (CCCD state); keeping them is the application's job. The record is a
//! fixed binary layout so it can be stored as one flash item:
//!
//! ```text
//! [0..2]   EDIV (little endian)
//! [2..10]  Rand
//! [10..26] LTK
//! [26]     LTK flags
//! [27..43] IRK
//! [43..49] peer address
//! [49]     peer address type
//! [50]     system attributes length (n)
//! [51..51+n] system attributes
//! ```

use heapless::Vec;

/// Capacity for GATT system attributes (CCCD values + CRC).
pub const SYS_ATTRS_CAPACITY: usize = 62;

const HEADER_SIZE: usize = 51;

/// Largest serialized record.
pub const MAX_RECORD_SIZE: usize = HEADER_SIZE + SYS_ATTRS_CAPACITY;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredBond {
    pub ediv: u16,
    pub rand: [u8; 8],
    pub ltk: [u8; 16],
    pub ltk_flags: u8,
    pub irk: [u8; 16],
    pub addr: [u8; 6],
    pub addr_type: u8,
    pub sys_attrs: Vec<u8, SYS_ATTRS_CAPACITY>,
}

impl StoredBond {
    /// Serialize into `buf`. Returns the number of bytes written, or 0 if
    /// `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let total = HEADER_SIZE + self.sys_attrs.len();
        if buf.len() < total {
            return 0;
        }

        buf[0..2].copy_from_slice(&self.ediv.to_le_bytes());
        buf[2..10].copy_from_slice(&self.rand);
        buf[10..26].copy_from_slice(&self.ltk);
        buf[26] = self.ltk_flags;
        buf[27..43].copy_from_slice(&self.irk);
        buf[43..49].copy_from_slice(&self.addr);
        buf[49] = self.addr_type;
        buf[50] = self.sys_attrs.len() as u8;
        buf[HEADER_SIZE..total].copy_from_slice(&self.sys_attrs);
        total
    }

    /// Parse a record. Truncated records and oversized attribute blocks
    /// are rejected.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE {
            return None;
        }

        let attrs_len = data[50] as usize;
        if attrs_len > SYS_ATTRS_CAPACITY || data.len() < HEADER_SIZE + attrs_len {
            return None;
        }

        let mut bond = Self {
            ediv: u16::from_le_bytes([data[0], data[1]]),
            ltk_flags: data[26],
            addr_type: data[49],
            ..Self::default()
        };
        bond.rand.copy_from_slice(&data[2..10]);
        bond.ltk.copy_from_slice(&data[10..26]);
        bond.irk.copy_from_slice(&data[27..43]);
        bond.addr.copy_from_slice(&data[43..49]);
        bond.sys_attrs
            .extend_from_slice(&data[HEADER_SIZE..HEADER_SIZE + attrs_len])
            .ok()?;
        Some(bond)
    }

    /// Replace the stored system attributes. Returns `false` (and keeps
    /// the old value) if `attrs` does not fit.
    pub fn set_sys_attrs(&mut self, attrs: &[u8]) -> bool {
        let Ok(next) = Vec::from_slice(attrs) else {
            return false;
        };
        self.sys_attrs = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredBond {
        let mut bond = StoredBond {
            ediv: 0xBEEF,
            rand: [1, 2, 3, 4, 5, 6, 7, 8],
            ltk: [0xA5; 16],
            ltk_flags: 0x03,
            irk: [0x5A; 16],
            addr: [0x11, 0x22, 0x33, 0x44, 0x55, 0xC6],
            addr_type: 1,
            sys_attrs: Vec::new(),
        };
        assert!(bond.set_sys_attrs(&[0x0C, 0x00, 0x02, 0x00, 0x01, 0x00]));
        bond
    }

    #[test]
    fn layout_is_fixed() {
        let bond = sample();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let len = bond.serialize(&mut buf);
        assert_eq!(len, HEADER_SIZE + 6);
        assert_eq!(&buf[0..2], &[0xEF, 0xBE]);
        assert_eq!(buf[26], 0x03);
        assert_eq!(&buf[43..49], &[0x11, 0x22, 0x33, 0x44, 0x55, 0xC6]);
        assert_eq!(buf[49], 1);
        assert_eq!(buf[50], 6);

        assert_eq!(StoredBond::deserialize(&buf[..len]), Some(bond));
    }

    #[test]
    fn buffer_too_small_writes_nothing() {
        let mut buf = [0u8; HEADER_SIZE];
        assert_eq!(sample().serialize(&mut buf), 0);
    }

    #[test]
    fn truncated_records_are_rejected() {
        let bond = sample();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let len = bond.serialize(&mut buf);
        assert!(StoredBond::deserialize(&buf[..len - 1]).is_none());
        assert!(StoredBond::deserialize(&buf[..10]).is_none());
        assert!(StoredBond::deserialize(&[]).is_none());
    }

    #[test]
    fn oversized_attribute_length_is_rejected() {
        let mut buf = [0u8; MAX_RECORD_SIZE + 8];
        buf[50] = (SYS_ATTRS_CAPACITY + 1) as u8;
        assert!(StoredBond::deserialize(&buf).is_none());
    }

    #[test]
    fn sys_attrs_that_do_not_fit_are_refused() {
        let mut bond = sample();
        assert!(!bond.set_sys_attrs(&[0u8; SYS_ATTRS_CAPACITY + 1]));
        assert_eq!(bond.sys_attrs.len(), 6);
        assert!(bond.set_sys_attrs(&[]));
        assert!(bond.sys_attrs.is_empty());
    }
}
