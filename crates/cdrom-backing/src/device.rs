use std::{
    io::{self, Read, Seek},
    path::Path,
};

use crate::msf::{AddressFormat, MediaPosition, Msf};

/// Size in bytes of one data sector.
pub const SECTOR_SIZE: u32 = 2048;

/// First and last track numbers on the disc.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TocHeader {
    pub first_track: u8,
    pub last_track: u8,
}

/// A single table-of-contents entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub track: u8,
    pub adr: u8,
    pub control: u8,
    pub address: MediaPosition,
}

/// Audio playback state as reported by the drive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    #[default]
    NoStatus,
    Playing,
    Paused,
    Completed,
    Error,
}

/// Current Q-subchannel position and audio state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Subchannel {
    pub audio_status: AudioStatus,
    pub adr: u8,
    pub control: u8,
    pub track: u8,
    pub index: u8,
    pub absolute: Msf,
    pub relative: Msf,
}

/// The block-addressable, read-only resource behind the emulated drive.
///
/// Reads go through [`Read`] and [`Seek`] on byte offsets. The remaining
/// methods are the drive control queries and commands.
pub trait CdromDevice: Read + Seek + Send {
    /// Total number of 2048-byte sectors on the medium.
    fn capacity_sectors(&mut self) -> io::Result<u32>;

    fn toc_header(&mut self) -> io::Result<TocHeader>;

    fn toc_entry(&mut self, track: u8, format: AddressFormat) -> io::Result<TocEntry>;

    /// Q-subchannel data with positions in MSF form.
    fn subchannel(&mut self) -> io::Result<Subchannel>;

    fn play_msf(&mut self, start: Msf, end: Msf) -> io::Result<()>;

    fn pause(&mut self) -> io::Result<()>;

    fn resume(&mut self) -> io::Result<()>;

    /// Whether the medium changed since the last call.
    fn media_changed(&mut self) -> io::Result<bool>;
}

/// Opens a device path into a [`CdromDevice`].
pub trait DeviceOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn CdromDevice>>;
}

impl<F> DeviceOpener for F
where
    F: Fn(&Path) -> io::Result<Box<dyn CdromDevice>> + Send + Sync,
{
    fn open(&self, path: &Path) -> io::Result<Box<dyn CdromDevice>> {
        self(path)
    }
}
