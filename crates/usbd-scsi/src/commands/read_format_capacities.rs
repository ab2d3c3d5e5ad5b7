use cdrom_backing::SECTOR_SIZE;
use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U32},
};

use crate::commands::{CommandBlock, be16};

/// Descriptor type 2: formatted media, current capacity.
pub const FORMATTED_MEDIA: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFormatCapacitiesCommand {
    pub alloc_len: u16,
}

impl CommandBlock for ReadFormatCapacitiesCommand {
    const OPCODE: u8 = 0x23;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            alloc_len: be16(cdb, 7),
        }
    }
}

/// Capacity list header with one current/maximum capacity descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct FormatCapacityList {
    pub reserved: [u8; 3],
    pub list_length: u8,
    pub block_count: U32<BigEndian>,
    pub descriptor_type: u8,
    /// 24-bit block length.
    pub block_length: [u8; 3],
}

impl FormatCapacityList {
    pub fn formatted(block_count: u32) -> Self {
        let [_, hi, mid, lo] = SECTOR_SIZE.to_be_bytes();
        Self {
            reserved: [0; 3],
            list_length: 8,
            block_count: U32::new(block_count),
            descriptor_type: FORMATTED_MEDIA,
            block_length: [hi, mid, lo],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn formatted_media_layout() {
        let list = FormatCapacityList::formatted(360_000);
        assert_eq!(
            list.as_bytes(),
            &[0, 0, 0, 8, 0x00, 0x05, 0x7e, 0x40, 0x02, 0x00, 0x08, 0x00]
        );
    }
}
