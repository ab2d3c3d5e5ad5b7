use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackingError {
    /// The device is not open, or could not be opened for reading.
    #[error("cd-rom device {} is unavailable", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },
    /// Seek, read, or control request failed on an open device.
    #[error("cd-rom device i/o failed")]
    Io(#[from] io::Error),
}

impl BackingError {
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, BackingError::DeviceUnavailable { .. })
    }
}
