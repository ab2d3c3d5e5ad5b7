use std::io;

use cdrom_backing::BackingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GadgetError {
    #[error("failed to allocate a {len} byte request buffer")]
    AllocationFailure { len: usize },
    #[error("transfer on {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("function is already bound")]
    AlreadyBound,
    #[error("function is not bound")]
    NotBound,
    #[error("alternate setting {0} does not exist")]
    InvalidAltSetting(u8),
    #[error(transparent)]
    Backing(#[from] BackingError),
    #[error("command worker is not running")]
    WorkerUnavailable,
    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}
