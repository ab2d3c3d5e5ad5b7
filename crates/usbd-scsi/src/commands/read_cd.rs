use crate::commands::{CommandBlock, be24, be32};

/// READ CD: `transfer_length` user-data sectors from `start_lba`.
///
/// The sector-type and header/sub-channel selection bytes are decoded but
/// the data returned is always the 2048-byte user data of each sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCdCommand {
    pub expected_sector_type: u8,
    pub start_lba: u32,
    /// 24-bit sector count.
    pub transfer_length: u32,
}

impl CommandBlock for ReadCdCommand {
    const OPCODE: u8 = 0xbe;
    const LEN: usize = 12;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            expected_sector_type: (cdb[1] >> 2) & 0x07,
            start_lba: be32(cdb, 2),
            transfer_length: be24(cdb, 6),
        }
    }
}
