//! The MMC CD-ROM command subset understood by the emulator.
//!
//! Each module decodes one command's CDB and lays out its response data.

pub mod inquiry;
pub mod mode_sense;
pub mod pause_resume;
pub mod play_audio;
pub mod read_capacity;
pub mod read_cd;
pub mod read_format_capacities;
pub mod read_subchannel;
pub mod read_toc;
pub mod request_sense;
pub mod test_unit_ready;

use crate::{
    ScsiError,
    commands::{
        inquiry::InquiryCommand,
        mode_sense::{ModeSense6Command, ModeSense10Command},
        pause_resume::PauseResumeCommand,
        play_audio::PlayAudio10Command,
        read_capacity::ReadCapacity10Command,
        read_cd::ReadCdCommand,
        read_format_capacities::ReadFormatCapacitiesCommand,
        read_subchannel::ReadSubchannelCommand,
        read_toc::ReadTocCommand,
        request_sense::RequestSenseCommand,
        test_unit_ready::TestUnitReadyCommand,
    },
};

pub trait CommandBlock: Sized {
    /// Operation code in byte 0 of the CDB.
    const OPCODE: u8;

    /// Length of the CDB in bytes.
    const LEN: usize;

    /// Decode the command fields from a CDB at least [`Self::LEN`] bytes long.
    fn from_cdb(cdb: &[u8]) -> Self;

    /// Decode the command, rejecting a CDB shorter than [`Self::LEN`].
    fn parse(cdb: &[u8]) -> Result<Self, ScsiError> {
        if cdb.len() < Self::LEN {
            return Err(ScsiError::TruncatedCommand {
                opcode: Self::OPCODE,
                expected: Self::LEN,
                actual: cdb.len(),
            });
        }
        Ok(Self::from_cdb(cdb))
    }
}

/// A decoded CDB, one variant per supported operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TestUnitReady(TestUnitReadyCommand),
    RequestSense(RequestSenseCommand),
    Inquiry(InquiryCommand),
    ModeSense6(ModeSense6Command),
    ReadFormatCapacities(ReadFormatCapacitiesCommand),
    ReadCapacity10(ReadCapacity10Command),
    ReadSubchannel(ReadSubchannelCommand),
    ReadToc(ReadTocCommand),
    PlayAudio10(PlayAudio10Command),
    PauseResume(PauseResumeCommand),
    ModeSense10(ModeSense10Command),
    ReadCd(ReadCdCommand),
}

impl Command {
    pub fn parse(cdb: &[u8]) -> Result<Self, ScsiError> {
        let opcode = *cdb.first().ok_or(ScsiError::EmptyCommand)?;

        let command = match opcode {
            TestUnitReadyCommand::OPCODE => Command::TestUnitReady(TestUnitReadyCommand::parse(cdb)?),
            RequestSenseCommand::OPCODE => Command::RequestSense(RequestSenseCommand::parse(cdb)?),
            InquiryCommand::OPCODE => Command::Inquiry(InquiryCommand::parse(cdb)?),
            ModeSense6Command::OPCODE => Command::ModeSense6(ModeSense6Command::parse(cdb)?),
            ReadFormatCapacitiesCommand::OPCODE => {
                Command::ReadFormatCapacities(ReadFormatCapacitiesCommand::parse(cdb)?)
            }
            ReadCapacity10Command::OPCODE => Command::ReadCapacity10(ReadCapacity10Command::parse(cdb)?),
            ReadSubchannelCommand::OPCODE => Command::ReadSubchannel(ReadSubchannelCommand::parse(cdb)?),
            ReadTocCommand::OPCODE => Command::ReadToc(ReadTocCommand::parse(cdb)?),
            PlayAudio10Command::OPCODE => Command::PlayAudio10(PlayAudio10Command::parse(cdb)?),
            PauseResumeCommand::OPCODE => Command::PauseResume(PauseResumeCommand::parse(cdb)?),
            ModeSense10Command::OPCODE => Command::ModeSense10(ModeSense10Command::parse(cdb)?),
            ReadCdCommand::OPCODE => Command::ReadCd(ReadCdCommand::parse(cdb)?),
            opcode => return Err(ScsiError::InvalidCommand { opcode }),
        };

        Ok(command)
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::TestUnitReady(_) => TestUnitReadyCommand::OPCODE,
            Command::RequestSense(_) => RequestSenseCommand::OPCODE,
            Command::Inquiry(_) => InquiryCommand::OPCODE,
            Command::ModeSense6(_) => ModeSense6Command::OPCODE,
            Command::ReadFormatCapacities(_) => ReadFormatCapacitiesCommand::OPCODE,
            Command::ReadCapacity10(_) => ReadCapacity10Command::OPCODE,
            Command::ReadSubchannel(_) => ReadSubchannelCommand::OPCODE,
            Command::ReadToc(_) => ReadTocCommand::OPCODE,
            Command::PlayAudio10(_) => PlayAudio10Command::OPCODE,
            Command::PauseResume(_) => PauseResumeCommand::OPCODE,
            Command::ModeSense10(_) => ModeSense10Command::OPCODE,
            Command::ReadCd(_) => ReadCdCommand::OPCODE,
        }
    }
}

pub(crate) fn be16(cdb: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([cdb[offset], cdb[offset + 1]])
}

pub(crate) fn be24(cdb: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([0, cdb[offset], cdb[offset + 1], cdb[offset + 2]])
}

pub(crate) fn be32(cdb: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        cdb[offset],
        cdb[offset + 1],
        cdb[offset + 2],
        cdb[offset + 3],
    ])
}

/// Copy as much of `response` as fits into `out`, returning the length written.
pub(crate) fn copy_response(response: &[u8], out: &mut [u8]) -> usize {
    let len = response.len().min(out.len());
    out[..len].copy_from_slice(&response[..len]);
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn parses_every_supported_opcode() {
        let opcodes = [
            0x00u8, 0x03, 0x12, 0x1a, 0x23, 0x25, 0x42, 0x43, 0x45, 0x4b, 0x5a, 0xbe,
        ];
        for opcode in opcodes {
            let mut cdb = [0u8; 12];
            cdb[0] = opcode;
            let command = Command::parse(&cdb).unwrap();
            assert_eq!(command.opcode(), opcode);
        }
    }

    #[test]
    pub fn rejects_unknown_and_malformed_cdbs() {
        assert!(matches!(
            Command::parse(&[0xff; 12]),
            Err(ScsiError::InvalidCommand { opcode: 0xff })
        ));
        assert!(matches!(Command::parse(&[]), Err(ScsiError::EmptyCommand)));
        assert!(matches!(
            Command::parse(&[0xbe, 0, 0, 0]),
            Err(ScsiError::TruncatedCommand {
                opcode: 0xbe,
                expected: 12,
                actual: 4
            })
        ));
    }

    #[test]
    pub fn longer_cdbs_are_accepted() {
        let mut cdb = [0u8; 16];
        cdb[0] = 0x00;
        assert_eq!(
            Command::parse(&cdb).unwrap(),
            Command::TestUnitReady(TestUnitReadyCommand)
        );
    }

    #[test]
    pub fn copy_response_truncates() {
        let mut out = [0u8; 3];
        assert_eq!(copy_response(&[1, 2, 3, 4], &mut out), 3);
        assert_eq!(out, [1, 2, 3]);
    }
}
