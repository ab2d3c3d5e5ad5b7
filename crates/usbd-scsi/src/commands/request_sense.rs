use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::commands::CommandBlock;

/// Current error, fixed format.
pub const FIXED_FORMAT_CURRENT: u8 = 0x70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSenseCommand {
    /// Descriptor format requested. Fixed format is always returned.
    pub desc: bool,
    pub alloc_len: u8,
}

impl CommandBlock for RequestSenseCommand {
    const OPCODE: u8 = 0x03;
    const LEN: usize = 6;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            desc: cdb[1] & 0x01 != 0,
            alloc_len: cdb[4],
        }
    }
}

/// Fixed-format sense data (18 bytes).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SenseData {
    pub response_code: u8,
    pub obsolete: u8,
    pub sense_key: u8,
    pub information: [u8; 4],
    pub additional_sense_length: u8,
    pub command_specific: [u8; 4],
    pub additional_sense_code: u8,
    pub additional_sense_code_qualifier: u8,
    pub field_replaceable_unit_code: u8,
    pub sense_key_specific: [u8; 3],
}

impl SenseData {
    /// Sense data with no error recorded. Failures are not tracked, so this
    /// is what every REQUEST SENSE returns.
    pub fn no_sense() -> Self {
        Self {
            response_code: FIXED_FORMAT_CURRENT,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn no_sense_is_all_zero_after_response_code() {
        let sense = SenseData::no_sense();
        let bytes = sense.as_bytes();
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0], 0x70);
        assert!(bytes[1..].iter().all(|&b| b == 0));
    }
}
