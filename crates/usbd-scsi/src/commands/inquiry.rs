use crate::commands::CommandBlock;

/// Length of standard INQUIRY data.
pub const INQUIRY_DATA_LEN: usize = 36;

/// SCSI INQUIRY command (CDB).
///
/// The host's first question to a new unit: what kind of device it is and
/// who made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryCommand {
    /// Enable vital product data.
    pub evpd: bool,
    pub page_code: u8,
    /// How many bytes the host expects back.
    pub alloc_len: u8,
}

impl CommandBlock for InquiryCommand {
    const OPCODE: u8 = 0x12;
    const LEN: usize = 6;

    fn from_cdb(cdb: &[u8]) -> Self {
        Self {
            evpd: cdb[1] & 0x01 != 0,
            page_code: cdb[2],
            alloc_len: cdb[4],
        }
    }
}

/// SCSI Peripheral Device Type field (from byte 0 of INQUIRY data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralDeviceType {
    /// Direct-access block device (e.g., disk).
    SbcDirectAccessDevice, // 0x00
    /// CD/DVD device.
    CdRomDevice, // 0x05
    /// Optical memory (e.g., MO disk).
    OpticalMemoryDevice, // 0x07
    /// Other or unrecognized value.
    OutOfScope(u8),
}

impl From<PeripheralDeviceType> for u8 {
    fn from(value: PeripheralDeviceType) -> Self {
        match value {
            PeripheralDeviceType::SbcDirectAccessDevice => 0x00,
            PeripheralDeviceType::CdRomDevice => 0x05,
            PeripheralDeviceType::OpticalMemoryDevice => 0x07,
            PeripheralDeviceType::OutOfScope(other) => other & 0x1f,
        }
    }
}

/// Standard INQUIRY data (first 36 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryData {
    pub peripheral_device_type: PeripheralDeviceType,
    pub is_removable: bool,
    /// Claimed SPC version (byte 2).
    pub version: u8,
    pub response_data_format: u8,
    /// Additional Length field (byte 4).
    pub additional_length: u8,
    /// ASCII vendor ID (8 bytes, space padded).
    pub vendor_identification: [u8; 8],
    /// ASCII product ID (16 bytes, space padded).
    pub product_identification: [u8; 16],
    /// ASCII product revision (4 bytes, space padded).
    pub product_revision_level: [u8; 4],
}

impl InquiryData {
    /// The identity this gadget reports: a removable CD-ROM drive.
    pub fn cdrom() -> Self {
        Self {
            peripheral_device_type: PeripheralDeviceType::CdRomDevice,
            is_removable: true,
            version: 0x04,
            response_data_format: 0x02,
            additional_length: 0x20,
            vendor_identification: *b"LINUX   ",
            product_identification: *b"CD-ROM  Redirect",
            product_revision_level: *b"1.00",
        }
    }

    pub fn to_bytes(&self) -> [u8; INQUIRY_DATA_LEN] {
        let mut buf = [0u8; INQUIRY_DATA_LEN];
        buf[0] = u8::from(self.peripheral_device_type);
        buf[1] = if self.is_removable { 0x80 } else { 0x00 };
        buf[2] = self.version;
        buf[3] = self.response_data_format;
        buf[4] = self.additional_length;
        buf[8..16].copy_from_slice(&self.vendor_identification);
        buf[16..32].copy_from_slice(&self.product_identification);
        buf[32..36].copy_from_slice(&self.product_revision_level);
        buf
    }
}
