use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    device::{CdromDevice, SECTOR_SIZE, Subchannel, TocEntry, TocHeader},
    msf::{AddressFormat, MediaPosition, Msf},
};

/// ADR 1 (Q-subchannel position), control 4 (data track).
const DATA_TRACK_ADR: u8 = 0x01;
const DATA_TRACK_CONTROL: u8 = 0x04;

/// A disc image made of 2048-byte sectors, presented as a single data track.
///
/// Audio transport is not available on an image.
pub struct ImageFile<R> {
    inner: R,
}

impl<R: Read + Seek> ImageFile<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl ImageFile<File> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

/// [`DeviceOpener`](crate::DeviceOpener) for image files.
pub fn open_image(path: &Path) -> io::Result<Box<dyn CdromDevice>> {
    Ok(Box::new(ImageFile::open(path)?))
}

impl<R: Read> Read for ImageFile<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for ImageFile<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

fn no_audio() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "disc images have no audio transport",
    )
}

impl<R: Read + Seek + Send> CdromDevice for ImageFile<R> {
    fn capacity_sectors(&mut self) -> io::Result<u32> {
        let position = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(position))?;

        u32::try_from(len / u64::from(SECTOR_SIZE))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "image too large"))
    }

    fn toc_header(&mut self) -> io::Result<TocHeader> {
        Ok(TocHeader {
            first_track: 1,
            last_track: 1,
        })
    }

    fn toc_entry(&mut self, track: u8, format: AddressFormat) -> io::Result<TocEntry> {
        if track != 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no track {track} on a disc image"),
            ));
        }

        let address = match format {
            AddressFormat::Lba => MediaPosition::Lba(0),
            AddressFormat::Msf => MediaPosition::Msf(Msf::from_lba(0)),
        };
        Ok(TocEntry {
            track,
            adr: DATA_TRACK_ADR,
            control: DATA_TRACK_CONTROL,
            address,
        })
    }

    fn subchannel(&mut self) -> io::Result<Subchannel> {
        Ok(Subchannel {
            adr: DATA_TRACK_ADR,
            control: DATA_TRACK_CONTROL,
            track: 1,
            index: 1,
            ..Subchannel::default()
        })
    }

    fn play_msf(&mut self, _start: Msf, _end: Msf) -> io::Result<()> {
        Err(no_audio())
    }

    fn pause(&mut self) -> io::Result<()> {
        Err(no_audio())
    }

    fn resume(&mut self) -> io::Result<()> {
        Err(no_audio())
    }

    fn media_changed(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    pub fn capacity_ignores_partial_sector_and_keeps_position() {
        let mut image = ImageFile::new(Cursor::new(vec![0u8; 3 * 2048 + 100]));
        image.seek(SeekFrom::Start(2048)).unwrap();
        assert_eq!(image.capacity_sectors().unwrap(), 3);
        assert_eq!(image.stream_position().unwrap(), 2048);
    }

    #[test]
    pub fn single_data_track() {
        let mut image = ImageFile::new(Cursor::new(Vec::new()));
        assert_eq!(image.toc_header().unwrap().last_track, 1);
        let entry = image.toc_entry(1, AddressFormat::Lba).unwrap();
        assert_eq!(entry.address, MediaPosition::Lba(0));
        assert_eq!(entry.control, 0x04);
        assert!(image.toc_entry(2, AddressFormat::Lba).is_err());
    }

    #[test]
    pub fn audio_transport_is_unsupported() {
        let mut image = ImageFile::new(Cursor::new(Vec::new()));
        let err = image.play_msf(Msf::default(), Msf::new(0, 1, 0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(!image.media_changed().unwrap());
    }
}
