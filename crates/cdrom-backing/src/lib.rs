mod backing;
mod device;
mod error;
mod image;
#[cfg(target_os = "linux")]
mod linux;
pub mod msf;

pub use backing::BackingStore;
pub use device::{
    AudioStatus, CdromDevice, DeviceOpener, SECTOR_SIZE, Subchannel, TocEntry, TocHeader,
};
pub use error::BackingError;
pub use image::{ImageFile, open_image};
#[cfg(target_os = "linux")]
pub use linux::{LinuxCdrom, open_cdrom};
pub use msf::{AddressFormat, MediaPosition, Msf};
