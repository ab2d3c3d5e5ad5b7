use crate::commands::CommandBlock;

/// TEST UNIT READY: succeeds only while the backing medium is accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestUnitReadyCommand;

impl CommandBlock for TestUnitReadyCommand {
    const OPCODE: u8 = 0x00;
    const LEN: usize = 6;

    fn from_cdb(_cdb: &[u8]) -> Self {
        Self
    }
}
