use cdrom_backing::BackingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScsiError {
    #[error(transparent)]
    Backing(#[from] BackingError),
    #[error("unsupported scsi opcode {opcode:#04x}")]
    InvalidCommand { opcode: u8 },
    #[error("empty command descriptor block")]
    EmptyCommand,
    #[error("cdb for opcode {opcode:#04x} is {actual} bytes, expected {expected}")]
    TruncatedCommand {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

impl ScsiError {
    /// True when the backing device was closed or could not be opened.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, ScsiError::Backing(err) if err.is_device_unavailable())
    }
}
