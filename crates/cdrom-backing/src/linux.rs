//! Host CD-ROM drives through the Linux `cdrom.h` ioctl interface.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom},
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::Path,
};

use nix::libc::{O_NONBLOCK, c_int};

use crate::{
    device::{AudioStatus, CdromDevice, SECTOR_SIZE, Subchannel, TocEntry, TocHeader},
    msf::{AddressFormat, MediaPosition, Msf},
};

const CDROM_LBA: u8 = 0x01;
const CDROM_MSF: u8 = 0x02;
const CDSL_CURRENT: c_int = c_int::MAX;

const CDROM_AUDIO_PLAY: u8 = 0x11;
const CDROM_AUDIO_PAUSED: u8 = 0x12;
const CDROM_AUDIO_COMPLETED: u8 = 0x13;
const CDROM_AUDIO_ERROR: u8 = 0x14;

#[repr(C)]
#[derive(Default)]
struct CdromMsf {
    min0: u8,
    sec0: u8,
    frame0: u8,
    min1: u8,
    sec1: u8,
    frame1: u8,
}

#[repr(C)]
#[derive(Default)]
struct CdromTocHdr {
    trk0: u8,
    trk1: u8,
}

/// `adr_ctrl` packs the 4-bit adr (low) and ctrl (high) bitfields.
#[repr(C)]
#[derive(Default)]
struct CdromTocEntry {
    track: u8,
    adr_ctrl: u8,
    format: u8,
    addr: i32,
    datamode: u8,
}

#[repr(C)]
#[derive(Default)]
struct CdromSubchnl {
    format: u8,
    audiostatus: u8,
    adr_ctrl: u8,
    trk: u8,
    ind: u8,
    absaddr: i32,
    reladdr: i32,
}

nix::ioctl_none_bad!(cdrom_pause, 0x5301);
nix::ioctl_none_bad!(cdrom_resume, 0x5302);
nix::ioctl_write_ptr_bad!(cdrom_play_msf, 0x5303, CdromMsf);
nix::ioctl_read_bad!(cdrom_read_toc_hdr, 0x5305, CdromTocHdr);
nix::ioctl_readwrite_bad!(cdrom_read_toc_entry, 0x5306, CdromTocEntry);
nix::ioctl_readwrite_bad!(cdrom_subchannel, 0x530b, CdromSubchnl);
nix::ioctl_write_int_bad!(cdrom_media_changed, 0x5325);
nix::ioctl_read_bad!(
    blk_get_size64,
    nix::request_code_read!(0x12, 114, std::mem::size_of::<usize>()),
    u64
);

/// The first three bytes of the address union hold minute, second, frame.
fn msf_from_addr(addr: i32) -> Msf {
    let [minute, second, frame, _] = addr.to_ne_bytes();
    Msf::new(minute, second, frame)
}

/// LBA form of the address union. Lead-in addresses are negative.
fn lba_from_addr(addr: i32) -> io::Result<u32> {
    u32::try_from(addr).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative track address {addr}"),
        )
    })
}

fn split_adr_ctrl(adr_ctrl: u8) -> (u8, u8) {
    (adr_ctrl & 0x0f, adr_ctrl >> 4)
}

/// A host optical drive such as `/dev/sr0`, opened read-only.
pub struct LinuxCdrom {
    file: File,
}

impl LinuxCdrom {
    /// Opens with `O_NONBLOCK` so an empty tray does not fail the open.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(O_NONBLOCK)
            .open(path)?;
        Ok(Self { file })
    }

    fn fd(&self) -> c_int {
        self.file.as_raw_fd()
    }
}

/// [`DeviceOpener`](crate::DeviceOpener) for host drives.
pub fn open_cdrom(path: &Path) -> io::Result<Box<dyn CdromDevice>> {
    Ok(Box::new(LinuxCdrom::open(path)?))
}

impl Read for LinuxCdrom {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for LinuxCdrom {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl CdromDevice for LinuxCdrom {
    fn capacity_sectors(&mut self) -> io::Result<u32> {
        let mut bytes = 0u64;
        unsafe { blk_get_size64(self.fd(), &mut bytes) }?;

        u32::try_from(bytes / u64::from(SECTOR_SIZE))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "medium too large"))
    }

    fn toc_header(&mut self) -> io::Result<TocHeader> {
        let mut header = CdromTocHdr::default();
        unsafe { cdrom_read_toc_hdr(self.fd(), &mut header) }?;

        Ok(TocHeader {
            first_track: header.trk0,
            last_track: header.trk1,
        })
    }

    fn toc_entry(&mut self, track: u8, format: AddressFormat) -> io::Result<TocEntry> {
        let mut entry = CdromTocEntry {
            track,
            format: match format {
                AddressFormat::Lba => CDROM_LBA,
                AddressFormat::Msf => CDROM_MSF,
            },
            ..CdromTocEntry::default()
        };
        unsafe { cdrom_read_toc_entry(self.fd(), &mut entry) }?;

        let (adr, control) = split_adr_ctrl(entry.adr_ctrl);
        let address = match format {
            AddressFormat::Lba => MediaPosition::Lba(lba_from_addr(entry.addr)?),
            AddressFormat::Msf => MediaPosition::Msf(msf_from_addr(entry.addr)),
        };
        Ok(TocEntry {
            track: entry.track,
            adr,
            control,
            address,
        })
    }

    fn subchannel(&mut self) -> io::Result<Subchannel> {
        let mut subchnl = CdromSubchnl {
            format: CDROM_MSF,
            ..CdromSubchnl::default()
        };
        unsafe { cdrom_subchannel(self.fd(), &mut subchnl) }?;

        let audio_status = match subchnl.audiostatus {
            CDROM_AUDIO_PLAY => AudioStatus::Playing,
            CDROM_AUDIO_PAUSED => AudioStatus::Paused,
            CDROM_AUDIO_COMPLETED => AudioStatus::Completed,
            CDROM_AUDIO_ERROR => AudioStatus::Error,
            _ => AudioStatus::NoStatus,
        };
        let (adr, control) = split_adr_ctrl(subchnl.adr_ctrl);
        Ok(Subchannel {
            audio_status,
            adr,
            control,
            track: subchnl.trk,
            index: subchnl.ind,
            absolute: msf_from_addr(subchnl.absaddr),
            relative: msf_from_addr(subchnl.reladdr),
        })
    }

    fn play_msf(&mut self, start: Msf, end: Msf) -> io::Result<()> {
        let msf = CdromMsf {
            min0: start.minute,
            sec0: start.second,
            frame0: start.frame,
            min1: end.minute,
            sec1: end.second,
            frame1: end.frame,
        };
        unsafe { cdrom_play_msf(self.fd(), &msf) }?;
        Ok(())
    }

    fn pause(&mut self) -> io::Result<()> {
        unsafe { cdrom_pause(self.fd()) }?;
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        unsafe { cdrom_resume(self.fd()) }?;
        Ok(())
    }

    fn media_changed(&mut self) -> io::Result<bool> {
        let changed = unsafe { cdrom_media_changed(self.fd(), CDSL_CURRENT) }?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn address_union_decodes_msf() {
        let addr = i32::from_ne_bytes([3, 15, 42, 0]);
        assert_eq!(msf_from_addr(addr), Msf::new(3, 15, 42));
    }

    #[test]
    pub fn negative_lba_is_invalid_data() {
        assert_eq!(lba_from_addr(150).unwrap(), 150);
        let err = lba_from_addr(-150).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    pub fn adr_ctrl_nibbles() {
        assert_eq!(split_adr_ctrl(0x41), (0x01, 0x04));
    }

    #[test]
    pub fn missing_device_fails_to_open() {
        assert!(LinuxCdrom::open(Path::new("/nonexistent/sr0")).is_err());
    }
}
