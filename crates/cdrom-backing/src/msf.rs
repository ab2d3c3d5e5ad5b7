/// Frames (sectors) per second of disc time.
pub const FRAMES_PER_SECOND: u32 = 75;
/// Seconds per minute of disc time.
pub const SECONDS_PER_MINUTE: u32 = 60;

const FRAMES_PER_MINUTE: u32 = FRAMES_PER_SECOND * SECONDS_PER_MINUTE;

/// A Minute:Second:Frame disc address.
///
/// Converts to and from a logical block address with
/// `lba = ((minute * 60) + second) * 75 + frame`. No lead-in offset is applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msf {
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
}

impl Msf {
    pub const fn new(minute: u8, second: u8, frame: u8) -> Self {
        Self {
            minute,
            second,
            frame,
        }
    }

    /// Converts a logical block address into MSF form.
    ///
    /// Addresses past 255:59:74 saturate the minute field.
    pub fn from_lba(lba: u32) -> Self {
        let minute = lba / FRAMES_PER_MINUTE;
        let second = (lba / FRAMES_PER_SECOND) % SECONDS_PER_MINUTE;
        let frame = lba % FRAMES_PER_SECOND;

        Self {
            minute: u8::try_from(minute).unwrap_or(u8::MAX),
            second: second as u8,
            frame: frame as u8,
        }
    }

    pub fn to_lba(self) -> u32 {
        (u32::from(self.minute) * SECONDS_PER_MINUTE + u32::from(self.second)) * FRAMES_PER_SECOND
            + u32::from(self.frame)
    }
}

impl std::fmt::Display for Msf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minute, self.second, self.frame)
    }
}

/// Addressing mode requested from, or reported by, the backing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    Lba,
    Msf,
}

/// A position on the disc in either representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPosition {
    Lba(u32),
    Msf(Msf),
}

impl MediaPosition {
    pub fn to_lba(self) -> u32 {
        match self {
            MediaPosition::Lba(lba) => lba,
            MediaPosition::Msf(msf) => msf.to_lba(),
        }
    }

    pub fn to_msf(self) -> Msf {
        match self {
            MediaPosition::Lba(lba) => Msf::from_lba(lba),
            MediaPosition::Msf(msf) => msf,
        }
    }
}

impl Default for MediaPosition {
    fn default() -> Self {
        MediaPosition::Lba(0)
    }
}
