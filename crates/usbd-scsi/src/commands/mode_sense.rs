use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U16},
};

use crate::commands::{CommandBlock, be16};

/// Total length of either MODE SENSE response.
pub const MODE_SENSE_RESPONSE_LEN: usize = 24;
/// Mode data length reported in the header.
const MODE_DATA_LENGTH: u8 = 22;
const MEDIUM_TYPE_CDROM: u8 = 0x05;
const WRITE_PROTECTED: u8 = 0x80;
const BLOCK_DESCRIPTOR_LEN: u8 = 0x08;
/// Both header variants place the page here.
const PAGE_OFFSET: usize = 8;

pub const CD_CAPABILITIES_PAGE: u8 = 0x2a;
const CAPS_PLAY_AUDIO: u8 = 0x01;
const CAPS_READ_SUBCHANNEL: u8 = 0x02;
const CAPS_READ_CD: u8 = 0x04;
/// Reads CD-DA and CD-ROM media.
const MEDIA_CD_DA_CD_ROM: u8 = 0x03;
/// 16x, in kB/s.
const READ_SPEED_16X: u16 = 0x0b06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSense6Command {
    /// Disable block descriptors.
    pub dbd: bool,
    pub page_control: u8,
    pub page_code: u8,
    pub alloc_len: u8,
}

impl CommandBlock for ModeSense6Command {
    const OPCODE: u8 = 0x1a;
    const LEN: usize = 6;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            dbd: cdb[1] & 0x08 != 0,
            page_control: cdb[2] >> 6,
            page_code: cdb[2] & 0x3f,
            alloc_len: cdb[4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSense10Command {
    pub dbd: bool,
    pub page_control: u8,
    pub page_code: u8,
    pub alloc_len: u16,
}

impl CommandBlock for ModeSense10Command {
    const OPCODE: u8 = 0x5a;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            dbd: cdb[1] & 0x08 != 0,
            page_control: cdb[2] >> 6,
            page_code: cdb[2] & 0x3f,
            alloc_len: be16(cdb, 7),
        }
    }
}

/// The CD capabilities and mechanical status page (0x2A), first 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CdCapabilitiesPage {
    pub page_code: u8,
    pub page_length: u8,
    pub capabilities: u8,
    pub media_support: u8,
    pub reserved: [u8; 4],
    pub max_read_speed: U16<BigEndian>,
    pub current_read_speed: U16<BigEndian>,
}

impl Default for CdCapabilitiesPage {
    fn default() -> Self {
        Self {
            page_code: CD_CAPABILITIES_PAGE,
            page_length: 16,
            capabilities: CAPS_PLAY_AUDIO | CAPS_READ_SUBCHANNEL | CAPS_READ_CD,
            media_support: MEDIA_CD_DA_CD_ROM,
            reserved: [0; 4],
            max_read_speed: U16::new(READ_SPEED_16X),
            current_read_speed: U16::new(READ_SPEED_16X),
        }
    }
}

fn with_page(mut response: [u8; MODE_SENSE_RESPONSE_LEN]) -> [u8; MODE_SENSE_RESPONSE_LEN] {
    let page = CdCapabilitiesPage::default();
    let page = page.as_bytes();
    response[PAGE_OFFSET..PAGE_OFFSET + page.len()].copy_from_slice(page);
    response
}

/// Response to MODE SENSE (6): one-byte mode data length at offset 0.
pub fn mode_sense6_response() -> [u8; MODE_SENSE_RESPONSE_LEN] {
    let mut response = [0u8; MODE_SENSE_RESPONSE_LEN];
    response[0] = MODE_DATA_LENGTH;
    response[1] = MEDIUM_TYPE_CDROM;
    response[2] = WRITE_PROTECTED;
    response[3] = BLOCK_DESCRIPTOR_LEN;
    with_page(response)
}

/// Response to MODE SENSE (10): two-byte mode data length at offsets 0-1.
pub fn mode_sense10_response() -> [u8; MODE_SENSE_RESPONSE_LEN] {
    let mut response = [0u8; MODE_SENSE_RESPONSE_LEN];
    response[1] = MODE_DATA_LENGTH;
    response[2] = MEDIUM_TYPE_CDROM;
    response[3] = WRITE_PROTECTED;
    response[7] = BLOCK_DESCRIPTOR_LEN;
    with_page(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: [u8; 12] = [
        0x2a, 0x10, 0x07, 0x03, 0, 0, 0, 0, 0x0b, 0x06, 0x0b, 0x06,
    ];

    #[test]
    pub fn six_byte_header() {
        let response = mode_sense6_response();
        assert_eq!(&response[..4], &[22, 0x05, 0x80, 0x08]);
        assert_eq!(&response[8..20], &PAGE);
        assert_eq!(&response[20..], &[0; 4]);
    }

    #[test]
    pub fn ten_byte_header() {
        let response = mode_sense10_response();
        assert_eq!(&response[..8], &[0, 22, 0x05, 0x80, 0, 0, 0, 0x08]);
        assert_eq!(&response[8..20], &PAGE);
    }

    #[test]
    pub fn decodes_page_request() {
        let cmd = ModeSense6Command::parse(&[0x1a, 0x08, 0x2a, 0, 0xff, 0]).unwrap();
        assert!(cmd.dbd);
        assert_eq!(cmd.page_code, CD_CAPABILITIES_PAGE);
        assert_eq!(cmd.alloc_len, 0xff);
    }
}
