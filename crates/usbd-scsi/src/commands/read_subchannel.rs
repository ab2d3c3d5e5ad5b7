use cdrom_backing::{AudioStatus, Msf, Subchannel};
use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U16},
};

use crate::commands::{CommandBlock, be16};

/// Sub-channel data format: current position (Q sub-channel).
pub const CURRENT_POSITION_FORMAT: u8 = 0x01;

/// READ SUB-CHANNEL (10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSubchannelCommand {
    pub msf: bool,
    pub subq: bool,
    pub format: u8,
    pub track: u8,
    pub alloc_len: u16,
}

impl CommandBlock for ReadSubchannelCommand {
    const OPCODE: u8 = 0x42;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            msf: cdb[1] & 0x02 != 0,
            subq: cdb[2] & 0x40 != 0,
            format: cdb[3],
            track: cdb[6],
            alloc_len: be16(cdb, 7),
        }
    }
}

/// MMC audio status codes.
pub fn audio_status_code(status: AudioStatus) -> u8 {
    match status {
        AudioStatus::Playing => 0x11,
        AudioStatus::Paused => 0x12,
        AudioStatus::Completed => 0x13,
        AudioStatus::Error => 0x14,
        AudioStatus::NoStatus => 0x15,
    }
}

fn msf_field(msf: Msf) -> [u8; 4] {
    [0, msf.minute, msf.second, msf.frame]
}

/// Header plus current-position data block (16 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SubchannelResponse {
    pub reserved: u8,
    pub audio_status: u8,
    pub data_length: U16<BigEndian>,
    pub format_code: u8,
    pub adr_control: u8,
    pub track: u8,
    pub index: u8,
    pub absolute_address: [u8; 4],
    pub relative_address: [u8; 4],
}

impl From<Subchannel> for SubchannelResponse {
    fn from(subchannel: Subchannel) -> Self {
        Self {
            reserved: 0,
            audio_status: audio_status_code(subchannel.audio_status),
            data_length: U16::new(12),
            format_code: CURRENT_POSITION_FORMAT,
            adr_control: (subchannel.control << 4) | (subchannel.adr & 0x0f),
            track: subchannel.track,
            index: subchannel.index,
            absolute_address: msf_field(subchannel.absolute),
            relative_address: msf_field(subchannel.relative),
        }
    }
}
