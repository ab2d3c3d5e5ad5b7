use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U16, U32},
};

use crate::commands::{CommandBlock, be16};

/// ADR 1 with control 4: a digital data track, copy permitted.
pub const DATA_TRACK_ADR_CONTROL: u8 = 0x14;

/// READ TOC/PMA/ATIP (10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTocCommand {
    /// Host asked for MSF addresses. The response is always LBA.
    pub msf: bool,
    pub format: u8,
    pub starting_track: u8,
    pub alloc_len: u16,
}

impl CommandBlock for ReadTocCommand {
    const OPCODE: u8 = 0x43;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            msf: cdb[1] & 0x02 != 0,
            format: cdb[2] & 0x0f,
            starting_track: cdb[6],
            alloc_len: be16(cdb, 7),
        }
    }
}

/// TOC header followed by a single track descriptor (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct TocResponse {
    /// Bytes following this field.
    pub data_length: U16<BigEndian>,
    pub first_track: u8,
    pub last_track: u8,
    pub reserved0: u8,
    pub adr_control: u8,
    pub track_number: u8,
    pub reserved1: u8,
    pub start_address: U32<BigEndian>,
}

impl TocResponse {
    pub fn single_track(first_track: u8, last_track: u8, track: u8, start_lba: u32) -> Self {
        Self {
            data_length: U16::new(10),
            first_track,
            last_track,
            reserved0: 0,
            adr_control: DATA_TRACK_ADR_CONTROL,
            track_number: track,
            reserved1: 0,
            start_address: U32::new(start_lba),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn single_track_layout() {
        let response = TocResponse::single_track(1, 12, 1, 0x0102_0304);
        assert_eq!(
            response.as_bytes(),
            &[0, 10, 1, 12, 0, 0x14, 1, 0, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    pub fn decodes_msf_bit_and_track() {
        let cmd = ReadTocCommand::parse(&[0x43, 0x02, 0, 0, 0, 0, 1, 0x03, 0x24, 0]).unwrap();
        assert!(cmd.msf);
        assert_eq!(cmd.starting_track, 1);
        assert_eq!(cmd.alloc_len, 804);
    }
}
