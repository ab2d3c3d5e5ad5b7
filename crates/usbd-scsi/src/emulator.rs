use std::sync::Arc;

use cdrom_backing::{AddressFormat, BackingError, BackingStore, SECTOR_SIZE};
use log::{debug, warn};
use zerocopy::IntoBytes;

use crate::{
    ScsiError,
    commands::{
        Command, copy_response,
        inquiry::InquiryData,
        mode_sense::{mode_sense6_response, mode_sense10_response},
        play_audio::PlayAudio10Command,
        read_capacity::ReadCapacity10Data,
        read_cd::ReadCdCommand,
        read_format_capacities::FormatCapacityList,
        read_subchannel::SubchannelResponse,
        read_toc::TocResponse,
        request_sense::SenseData,
    },
};

/// Executes CDBs against a [`BackingStore`].
///
/// Every response is written into the caller's buffer and truncated to its
/// length. While the backing device is closed every command, supported or
/// not, fails with a device-unavailable error.
pub struct Emulator {
    backing: Arc<BackingStore>,
}

impl Emulator {
    pub fn new(backing: Arc<BackingStore>) -> Self {
        Self { backing }
    }

    pub fn backing(&self) -> &Arc<BackingStore> {
        &self.backing
    }

    /// Run one CDB, returning the number of response bytes written to `out`.
    pub fn execute(&self, cdb: &[u8], out: &mut [u8]) -> Result<usize, ScsiError> {
        if !self.backing.is_open() {
            return Err(BackingError::DeviceUnavailable {
                path: self.backing.path(),
                source: None,
            }
            .into());
        }

        let command = match Command::parse(cdb) {
            Ok(command) => command,
            Err(err) => {
                warn!("Rejected cdb: {err}");
                return Err(err);
            }
        };
        debug!("Executing {command:?}");

        match command {
            Command::TestUnitReady(_) => Ok(0),
            Command::RequestSense(_) => Ok(copy_response(SenseData::no_sense().as_bytes(), out)),
            Command::Inquiry(_) => Ok(copy_response(&InquiryData::cdrom().to_bytes(), out)),
            Command::ModeSense6(_) => Ok(copy_response(&mode_sense6_response(), out)),
            Command::ModeSense10(_) => Ok(copy_response(&mode_sense10_response(), out)),
            Command::ReadFormatCapacities(_) => {
                let sectors = self.backing.capacity_sectors()?;
                Ok(copy_response(
                    FormatCapacityList::formatted(sectors).as_bytes(),
                    out,
                ))
            }
            Command::ReadCapacity10(_) => {
                let sectors = self.backing.capacity_sectors()?;
                Ok(copy_response(
                    ReadCapacity10Data::for_sectors(sectors).as_bytes(),
                    out,
                ))
            }
            Command::ReadSubchannel(_) => {
                let subchannel = self.backing.subchannel_status()?;
                Ok(copy_response(
                    SubchannelResponse::from(subchannel).as_bytes(),
                    out,
                ))
            }
            Command::ReadToc(_) => self.read_toc(out),
            Command::PlayAudio10(cmd) => self.play_audio(cmd),
            Command::PauseResume(cmd) => {
                if cmd.resume {
                    self.backing.resume()?;
                } else {
                    self.backing.pause()?;
                }
                Ok(0)
            }
            Command::ReadCd(cmd) => self.read_cd(cmd, out),
        }
    }

    fn read_toc(&self, out: &mut [u8]) -> Result<usize, ScsiError> {
        let header = self.backing.read_toc_header()?;
        let entry = self
            .backing
            .read_toc_entry(header.first_track, AddressFormat::Lba)?;

        let response = TocResponse::single_track(
            header.first_track,
            header.last_track,
            entry.track,
            entry.address.to_lba(),
        );
        Ok(copy_response(response.as_bytes(), out))
    }

    fn play_audio(&self, cmd: PlayAudio10Command) -> Result<usize, ScsiError> {
        match cmd.range() {
            Some((start, end)) => self.backing.play(start, end)?,
            None => debug!("Zero-length play at lba {}", cmd.start_lba),
        }
        Ok(0)
    }

    /// A short read from the medium is trimmed to whole sectors; a read cut
    /// short by `out`, or asked for less than a sector, is returned as is.
    fn read_cd(&self, cmd: ReadCdCommand, out: &mut [u8]) -> Result<usize, ScsiError> {
        let sector = SECTOR_SIZE as usize;
        let requested = (cmd.transfer_length as usize)
            .saturating_mul(sector)
            .min(out.len());

        let read = self
            .backing
            .read_sectors(cmd.start_lba, cmd.transfer_length, out)?;

        if read < requested && requested >= sector {
            Ok(read - read % sector)
        } else {
            Ok(read)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Cursor, Read, Seek, SeekFrom},
        path::Path,
        sync::Mutex,
    };

    use cdrom_backing::{
        AudioStatus, CdromDevice, ImageFile, MediaPosition, Msf, Subchannel, TocEntry, TocHeader,
    };

    use super::*;

    #[derive(Default)]
    struct Calls {
        plays: Vec<(Msf, Msf)>,
        pauses: usize,
        resumes: usize,
    }

    struct FakeDrive {
        data: Cursor<Vec<u8>>,
        capacity: u32,
        calls: Arc<Mutex<Calls>>,
    }

    impl Read for FakeDrive {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Seek for FakeDrive {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.data.seek(pos)
        }
    }

    impl CdromDevice for FakeDrive {
        fn capacity_sectors(&mut self) -> io::Result<u32> {
            Ok(self.capacity)
        }

        fn toc_header(&mut self) -> io::Result<TocHeader> {
            Ok(TocHeader {
                first_track: 1,
                last_track: 9,
            })
        }

        fn toc_entry(&mut self, track: u8, format: AddressFormat) -> io::Result<TocEntry> {
            assert_eq!(format, AddressFormat::Lba);
            Ok(TocEntry {
                track,
                adr: 1,
                control: 4,
                address: MediaPosition::Lba(150),
            })
        }

        fn subchannel(&mut self) -> io::Result<Subchannel> {
            Ok(Subchannel {
                audio_status: AudioStatus::Paused,
                adr: 1,
                control: 0,
                track: 2,
                index: 1,
                absolute: Msf::new(4, 2, 0),
                relative: Msf::new(0, 30, 1),
            })
        }

        fn play_msf(&mut self, start: Msf, end: Msf) -> io::Result<()> {
            self.calls.lock().unwrap().plays.push((start, end));
            Ok(())
        }

        fn pause(&mut self) -> io::Result<()> {
            self.calls.lock().unwrap().pauses += 1;
            Ok(())
        }

        fn resume(&mut self) -> io::Result<()> {
            self.calls.lock().unwrap().resumes += 1;
            Ok(())
        }

        fn media_changed(&mut self) -> io::Result<bool> {
            Ok(false)
        }
    }

    const SUPPORTED: [u8; 12] = [
        0x00, 0x03, 0x12, 0x1a, 0x23, 0x25, 0x42, 0x43, 0x45, 0x4b, 0x5a, 0xbe,
    ];

    fn emulator(capacity: u32, medium_sectors: usize) -> (Emulator, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let shared = calls.clone();
        let store = BackingStore::new(
            "/dev/sr0",
            move |_: &Path| -> io::Result<Box<dyn CdromDevice>> {
                let mut data = vec![0u8; medium_sectors * 2048];
                for (i, sector) in data.chunks_mut(2048).enumerate() {
                    sector.fill(0x10 + i as u8);
                }
                Ok(Box::new(FakeDrive {
                    data: Cursor::new(data),
                    capacity,
                    calls: shared.clone(),
                }))
            },
        );
        store.open().unwrap();
        (Emulator::new(Arc::new(store)), calls)
    }

    fn cdb(opcode: u8) -> [u8; 12] {
        let mut cdb = [0u8; 12];
        cdb[0] = opcode;
        cdb
    }

    #[test]
    pub fn read_capacity_scenario() {
        let (emulator, _) = emulator(360_000, 0);
        let mut out = [0u8; 512];
        let len = emulator
            .execute(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0], &mut out)
            .unwrap();
        assert_eq!(&out[..len], &[0x00, 0x05, 0x7a, 0xff, 0x00, 0x00, 0x08, 0x00]);
    }

    #[test]
    pub fn mode_sense6_scenario() {
        let (emulator, _) = emulator(1, 0);
        let mut out = [0u8; 512];
        let len = emulator.execute(&cdb(0x1a)[..6], &mut out).unwrap();
        assert_eq!(len, 24);
        assert_eq!(out[0], 22);
        assert_eq!(out[1], 0x05);
        assert_eq!(out[3], 0x08);
        assert_eq!(&out[8..12], &[0x2a, 0x10, 0x07, 0x03]);
    }

    #[test]
    pub fn unknown_opcode_is_invalid() {
        let (emulator, _) = emulator(1, 0);
        let mut out = [0xaau8; 16];
        let err = emulator.execute(&[0xff; 12], &mut out).unwrap_err();
        assert!(matches!(err, ScsiError::InvalidCommand { opcode: 0xff }));
        assert!(out.iter().all(|&b| b == 0xaa));
    }

    #[test]
    pub fn every_opcode_fails_while_closed() {
        let (emulator, _) = emulator(100, 4);
        emulator.backing().close();

        let mut out = [0u8; 512];
        for opcode in SUPPORTED.into_iter().chain([0xff, 0x28]) {
            let err = emulator.execute(&cdb(opcode), &mut out).unwrap_err();
            assert!(err.is_device_unavailable(), "opcode {opcode:#04x}: {err}");
        }
    }

    #[test]
    pub fn responses_never_exceed_capacity() {
        let (emulator, _) = emulator(100, 4);
        for capacity in [0usize, 1, 7, 13, 512, 4096] {
            let mut out = vec![0u8; capacity];
            for opcode in SUPPORTED {
                let mut cdb = cdb(opcode);
                if opcode == 0xbe {
                    cdb[8] = 2;
                }
                let len = emulator.execute(&cdb, &mut out).unwrap();
                assert!(len <= capacity, "opcode {opcode:#04x} wrote {len} into {capacity}");
            }
        }
    }

    #[test]
    pub fn natural_lengths() {
        let (emulator, _) = emulator(100, 4);
        let mut out = [0u8; 512];
        let expected = [
            (0x00, 0),
            (0x03, 18),
            (0x12, 36),
            (0x1a, 24),
            (0x5a, 24),
            (0x23, 12),
            (0x25, 8),
            (0x42, 16),
            (0x43, 12),
            (0x45, 0),
            (0x4b, 0),
        ];
        for (opcode, len) in expected {
            assert_eq!(emulator.execute(&cdb(opcode), &mut out).unwrap(), len);
        }
    }

    #[test]
    pub fn read_cd_zero_count_reads_nothing() {
        let (emulator, _) = emulator(100, 4);
        let mut out = [0u8; 4096];
        assert_eq!(emulator.execute(&cdb(0xbe), &mut out).unwrap(), 0);
    }

    #[test]
    pub fn read_cd_returns_sector_data() {
        let (emulator, _) = emulator(4, 4);
        let mut out = vec![0u8; 3 * 2048];
        let mut read = cdb(0xbe);
        read[5] = 1;
        read[8] = 2;
        assert_eq!(emulator.execute(&read, &mut out).unwrap(), 4096);
        assert!(out[..2048].iter().all(|&b| b == 0x11));
        assert!(out[2048..4096].iter().all(|&b| b == 0x12));
    }

    #[test]
    pub fn read_cd_past_end_trims_to_sectors_read() {
        let (emulator, _) = emulator(4, 4);
        let mut out = vec![0u8; 4 * 2048];
        let mut read = cdb(0xbe);
        read[5] = 3;
        read[8] = 4;
        assert_eq!(emulator.execute(&read, &mut out).unwrap(), 2048);
    }

    #[test]
    pub fn read_cd_is_cut_by_small_buffer() {
        let (emulator, _) = emulator(4, 4);
        let mut out = [0u8; 512];
        let mut read = cdb(0xbe);
        read[8] = 1;
        assert_eq!(emulator.execute(&read, &mut out).unwrap(), 512);
        assert!(out.iter().all(|&b| b == 0x10));
    }

    #[test]
    pub fn short_read_into_sub_sector_buffer_is_kept() {
        let store = BackingStore::new("disc.iso", |_: &Path| -> io::Result<Box<dyn CdromDevice>> {
            Ok(Box::new(ImageFile::new(Cursor::new(vec![0x5au8; 300]))))
        });
        store.open().unwrap();
        let emulator = Emulator::new(Arc::new(store));

        let mut out = [0u8; 512];
        let mut read = cdb(0xbe);
        read[8] = 1;
        assert_eq!(emulator.execute(&read, &mut out).unwrap(), 300);
        assert!(out[..300].iter().all(|&b| b == 0x5a));
    }

    #[test]
    pub fn read_toc_uses_first_track_lba() {
        let (emulator, _) = emulator(100, 0);
        let mut out = [0u8; 512];
        let len = emulator.execute(&cdb(0x43), &mut out).unwrap();
        assert_eq!(&out[..len], &[0, 10, 1, 9, 0, 0x14, 1, 0, 0, 0, 0, 150]);
    }

    #[test]
    pub fn read_subchannel_reports_paused() {
        let (emulator, _) = emulator(100, 0);
        let mut out = [0u8; 512];
        let len = emulator.execute(&cdb(0x42), &mut out).unwrap();
        assert_eq!(
            &out[..len],
            &[0, 0x12, 0, 12, 0x01, 0x01, 2, 1, 0, 4, 2, 0, 0, 0, 30, 1]
        );
    }

    #[test]
    pub fn play_pause_resume_reach_drive() {
        let (emulator, calls) = emulator(100, 0);
        let mut out = [0u8; 512];

        let mut play = cdb(0x45);
        play[5] = 75;
        play[8] = 75;
        emulator.execute(&play, &mut out).unwrap();

        let mut zero_play = cdb(0x45);
        zero_play[5] = 75;
        emulator.execute(&zero_play, &mut out).unwrap();

        emulator.execute(&cdb(0x4b), &mut out).unwrap();
        let mut resume = cdb(0x4b);
        resume[8] = 0x01;
        emulator.execute(&resume, &mut out).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.plays, vec![(Msf::new(0, 1, 0), Msf::new(0, 1, 74))]);
        assert_eq!(calls.pauses, 1);
        assert_eq!(calls.resumes, 1);
    }

    #[test]
    pub fn truncated_cdb_is_rejected() {
        let (emulator, _) = emulator(100, 0);
        let mut out = [0u8; 512];
        let err = emulator.execute(&[0x25, 0, 0], &mut out).unwrap_err();
        assert!(matches!(err, ScsiError::TruncatedCommand { opcode: 0x25, .. }));
    }
}
