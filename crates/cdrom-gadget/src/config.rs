use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use cdrom_backing::{CdromDevice, open_image};

use crate::descriptors::COMMAND_BUFFER_LEN;

pub const DEFAULT_DEVICE_PATH: &str = "/dev/sr0";
pub const DEFAULT_MEDIA_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_WORKER_QUEUE_DEPTH: usize = 8;

/// What kind of file sits at the device path.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// A host optical drive driven through CD-ROM ioctls.
    #[default]
    Cdrom,
    /// A plain image of 2048-byte sectors.
    Image,
}

impl Backend {
    pub fn opener(self) -> fn(&Path) -> io::Result<Box<dyn CdromDevice>> {
        match self {
            Backend::Cdrom => open_host_cdrom,
            Backend::Image => open_image,
        }
    }
}

#[cfg(target_os = "linux")]
fn open_host_cdrom(path: &Path) -> io::Result<Box<dyn CdromDevice>> {
    cdrom_backing::open_cdrom(path)
}

#[cfg(not(target_os = "linux"))]
fn open_host_cdrom(path: &Path) -> io::Result<Box<dyn CdromDevice>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{}: host cd-rom drives are only supported on linux", path.display()),
    ))
}

#[derive(Debug, Clone)]
pub struct GadgetConfig {
    /// Backing device path. Can be changed at runtime.
    pub device_path: PathBuf,
    pub backend: Backend,
    pub media_poll_interval: Duration,
    pub worker_queue_depth: usize,
    /// Largest response a single command may produce.
    pub response_capacity: usize,
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            backend: Backend::default(),
            media_poll_interval: DEFAULT_MEDIA_POLL_INTERVAL,
            worker_queue_depth: DEFAULT_WORKER_QUEUE_DEPTH,
            response_capacity: COMMAND_BUFFER_LEN,
        }
    }
}
