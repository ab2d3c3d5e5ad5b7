use cdrom_backing::SECTOR_SIZE;
use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U32},
};

use crate::commands::CommandBlock;

/// READ CAPACITY (10) command, answered with 8 bytes of capacity data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCapacity10Command {
    pub logical_unit_number: u8,
}

impl CommandBlock for ReadCapacity10Command {
    const OPCODE: u8 = 0x25;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        // Byte 1: LUN in the upper 3 bits (bits 7-5)
        Self {
            logical_unit_number: (cdb[1] >> 5) & 0x07,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ReadCapacity10Data {
    pub last_logical_block_address: U32<BigEndian>,
    pub block_length_bytes: U32<BigEndian>,
}

impl ReadCapacity10Data {
    /// Capacity data for a medium of `sectors` 2048-byte blocks.
    ///
    /// An empty medium reports last LBA 0.
    pub fn for_sectors(sectors: u32) -> Self {
        Self {
            last_logical_block_address: U32::new(sectors.saturating_sub(1)),
            block_length_bytes: U32::new(SECTOR_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn big_endian_layout() {
        let data = ReadCapacity10Data::for_sectors(360_000);
        assert_eq!(data.as_bytes(), &[0x00, 0x05, 0x7a, 0xff, 0x00, 0x00, 0x08, 0x00]);
    }

    #[test]
    pub fn empty_medium_does_not_underflow() {
        let data = ReadCapacity10Data::for_sectors(0);
        assert_eq!(data.last_logical_block_address.get(), 0);
    }
}
