use cdrom_backing::MediaPosition;

use crate::commands::{CommandBlock, be16, be32};

/// PLAY AUDIO (10): play `length` sectors starting at `start_lba`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayAudio10Command {
    pub start_lba: u32,
    pub length: u16,
}

impl CommandBlock for PlayAudio10Command {
    const OPCODE: u8 = 0x45;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            start_lba: be32(cdb, 2),
            length: be16(cdb, 7),
        }
    }
}

impl PlayAudio10Command {
    /// Inclusive start and end positions, or `None` when nothing is to be played.
    pub fn range(&self) -> Option<(MediaPosition, MediaPosition)> {
        let last = u32::from(self.length.checked_sub(1)?);
        Some((
            MediaPosition::Lba(self.start_lba),
            MediaPosition::Lba(self.start_lba.saturating_add(last)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use cdrom_backing::Msf;

    use super::*;

    #[test]
    pub fn end_is_inclusive() {
        let cmd = PlayAudio10Command::parse(&[0x45, 0, 0, 0, 0x11, 0x94, 0, 0x01, 0x2c, 0]).unwrap();
        assert_eq!(cmd.start_lba, 4500);
        assert_eq!(cmd.length, 300);

        let (start, end) = cmd.range().unwrap();
        assert_eq!(start.to_msf(), Msf::new(1, 0, 0));
        assert_eq!(end.to_msf(), Msf::new(1, 3, 74));
    }

    #[test]
    pub fn zero_length_plays_nothing() {
        let cmd = PlayAudio10Command {
            start_lba: 10,
            length: 0,
        };
        assert!(cmd.range().is_none());
    }
}
