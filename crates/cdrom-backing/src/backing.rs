use std::{
    io::{self, SeekFrom},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, info, warn};

use crate::{
    device::{CdromDevice, DeviceOpener, SECTOR_SIZE, Subchannel, TocEntry, TocHeader},
    error::BackingError,
    msf::{AddressFormat, MediaPosition},
};

struct BackingState {
    path: PathBuf,
    /// `Some` exactly while the device is open.
    device: Option<Box<dyn CdromDevice>>,
}

/// The single shared handle to the backing CD-ROM device.
///
/// Every operation holds one lock for its whole duration, so the open flag
/// and the handle can never disagree and reads never interleave with ioctls.
/// Everything except [`open`](Self::open) and [`close`](Self::close) fails
/// with [`BackingError::DeviceUnavailable`] while the device is closed.
pub struct BackingStore {
    state: Mutex<BackingState>,
    opener: Box<dyn DeviceOpener>,
}

impl BackingStore {
    pub fn new(path: impl Into<PathBuf>, opener: impl DeviceOpener + 'static) -> Self {
        Self {
            state: Mutex::new(BackingState {
                path: path.into(),
                device: None,
            }),
            opener: Box::new(opener),
        }
    }

    fn state(&self) -> MutexGuard<'_, BackingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> PathBuf {
        self.state().path.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().device.is_some()
    }

    /// Opens the configured path. Does nothing if the device is already open.
    pub fn open(&self) -> Result<(), BackingError> {
        let mut state = self.state();
        self.open_locked(&mut state)
    }

    fn open_locked(&self, state: &mut BackingState) -> Result<(), BackingError> {
        if state.device.is_some() {
            return Ok(());
        }

        match self.opener.open(&state.path) {
            Ok(device) => {
                state.device = Some(device);
                info!("Opened cd-rom device {}", state.path.display());
                Ok(())
            }
            Err(err) => {
                log::error!(
                    "Failed to open cd-rom device {}: {}",
                    state.path.display(),
                    err
                );
                Err(BackingError::DeviceUnavailable {
                    path: state.path.clone(),
                    source: Some(err),
                })
            }
        }
    }

    /// Releases the handle. Safe to call when already closed.
    pub fn close(&self) {
        let mut state = self.state();
        if state.device.take().is_some() {
            info!("Closed cd-rom device {}", state.path.display());
        }
    }

    /// Changes the device path. An open device is closed and reopened at the new path.
    pub fn set_path(&self, path: impl AsRef<Path>) -> Result<(), BackingError> {
        let mut state = self.state();
        state.path = path.as_ref().to_path_buf();

        if state.device.take().is_some() {
            info!(
                "Device path changed to {}, reopening",
                state.path.display()
            );
            self.open_locked(&mut state)?;
        }

        Ok(())
    }

    fn with_device<T>(
        &self,
        op: impl FnOnce(&mut dyn CdromDevice) -> io::Result<T>,
    ) -> Result<T, BackingError> {
        let mut state = self.state();
        let BackingState { path, device } = &mut *state;
        match device {
            Some(device) => Ok(op(device.as_mut())?),
            None => Err(BackingError::DeviceUnavailable {
                path: path.clone(),
                source: None,
            }),
        }
    }

    /// Seeks to `lba * 2048` and reads up to `count` sectors into `out`.
    ///
    /// At most `out.len()` bytes are read. The returned length is what the
    /// device actually produced, which is short at the end of the medium.
    pub fn read_sectors(&self, lba: u32, count: u32, out: &mut [u8]) -> Result<usize, BackingError> {
        let offset = u64::from(lba) * u64::from(SECTOR_SIZE);
        let requested = u64::from(count) * u64::from(SECTOR_SIZE);
        let want = usize::try_from(requested).map_or(out.len(), |len| len.min(out.len()));

        self.with_device(|device| {
            device.seek(SeekFrom::Start(offset))?;

            let mut filled = 0;
            while filled < want {
                match device.read(&mut out[filled..want]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }

            if filled < want {
                debug!("Short read at lba {lba}: {filled} of {want} bytes");
            }
            Ok(filled)
        })
    }

    pub fn capacity_sectors(&self) -> Result<u32, BackingError> {
        self.with_device(|device| device.capacity_sectors())
    }

    pub fn read_toc_header(&self) -> Result<TocHeader, BackingError> {
        self.with_device(|device| device.toc_header())
    }

    pub fn read_toc_entry(&self, track: u8, format: AddressFormat) -> Result<TocEntry, BackingError> {
        self.with_device(|device| device.toc_entry(track, format))
    }

    pub fn subchannel_status(&self) -> Result<Subchannel, BackingError> {
        self.with_device(|device| device.subchannel())
    }

    pub fn play(&self, start: MediaPosition, end: MediaPosition) -> Result<(), BackingError> {
        let (start, end) = (start.to_msf(), end.to_msf());
        debug!("Playing audio {start} - {end}");
        self.with_device(|device| device.play_msf(start, end))
    }

    pub fn pause(&self) -> Result<(), BackingError> {
        self.with_device(|device| device.pause())
    }

    pub fn resume(&self) -> Result<(), BackingError> {
        self.with_device(|device| device.resume())
    }

    /// Best-effort media change check; any failure reads as "unchanged".
    pub fn poll_media_changed(&self) -> bool {
        match self.with_device(|device| device.media_changed()) {
            Ok(changed) => changed,
            Err(BackingError::DeviceUnavailable { .. }) => false,
            Err(err) => {
                warn!("Media change check failed: {err}");
                false
            }
        }
    }
}
