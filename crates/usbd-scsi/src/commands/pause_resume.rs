use crate::commands::CommandBlock;

/// PAUSE/RESUME: bit 0 of byte 8 set means resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseResumeCommand {
    pub resume: bool,
}

impl CommandBlock for PauseResumeCommand {
    const OPCODE: u8 = 0x4b;
    const LEN: usize = 10;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            resume: cdb[8] & 0x01 != 0,
        }
    }
}
