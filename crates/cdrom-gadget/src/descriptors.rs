//! Static interface and endpoint data for the mass-storage function.

/// USB Mass Storage class.
pub const INTERFACE_CLASS_MASS_STORAGE: u8 = 0x08;
/// SCSI transparent command set.
pub const INTERFACE_SUBCLASS_SCSI: u8 = 0x06;
/// Bulk-Only Transport.
pub const INTERFACE_PROTOCOL_BULK_ONLY: u8 = 0x50;

pub const INTERFACE_NAME: &str = "CD-ROM Redirect";

/// Size of the buffer armed on the OUT endpoint for each command.
pub const COMMAND_BUFFER_LEN: usize = 512;

/// Direction bit of an endpoint address.
pub const ENDPOINT_DIR_IN: u8 = 0x80;

/// Negotiated bus speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbSpeed {
    Full,
    High,
    Super,
}

impl UsbSpeed {
    /// Bulk wMaxPacketSize at this speed.
    pub fn bulk_max_packet_size(self) -> u16 {
        match self {
            UsbSpeed::Full => 64,
            UsbSpeed::High => 512,
            UsbSpeed::Super => 1024,
        }
    }

    /// Inverse of [`bulk_max_packet_size`](Self::bulk_max_packet_size).
    pub fn from_bulk_max_packet_size(size: usize) -> Option<Self> {
        match size {
            64 => Some(UsbSpeed::Full),
            512 => Some(UsbSpeed::High),
            1024 => Some(UsbSpeed::Super),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub max_packet_size: u16,
}

impl EndpointDescriptor {
    pub fn bulk(address: u8, speed: UsbSpeed) -> Self {
        Self {
            address,
            max_packet_size: speed.bulk_max_packet_size(),
        }
    }

    pub fn is_in(&self) -> bool {
        self.address & ENDPOINT_DIR_IN != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn packet_sizes_by_speed() {
        assert_eq!(UsbSpeed::Full.bulk_max_packet_size(), 64);
        assert_eq!(UsbSpeed::High.bulk_max_packet_size(), 512);
        assert_eq!(UsbSpeed::Super.bulk_max_packet_size(), 1024);
        assert_eq!(UsbSpeed::from_bulk_max_packet_size(512), Some(UsbSpeed::High));
        assert_eq!(UsbSpeed::from_bulk_max_packet_size(8), None);
    }

    #[test]
    pub fn direction_from_address() {
        assert!(EndpointDescriptor::bulk(0x81, UsbSpeed::High).is_in());
        assert!(!EndpointDescriptor::bulk(0x02, UsbSpeed::High).is_in());
    }
}
