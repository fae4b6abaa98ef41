//! Class of device bitfield.
//!
//! Three bytes, Little Endian on the wire. Decoded only for logging:
//! ```text
//! bits 23..13  major service classes
//! bits 12..8   major device class
//! bits  7..2   minor device class
//! bits  1..0   format type (00 = format #1)
//! ```

use std::fmt;

use bytes::Buf;

const MAJOR_SERVICE_CLASSES: [(u32, &str); 9] = [
    (1 << 13, "Limited Discoverable Mode"),
    (1 << 16, "Positioning"),
    (1 << 17, "Networking"),
    (1 << 18, "Rendering"),
    (1 << 19, "Capturing"),
    (1 << 20, "Object Transfer"),
    (1 << 21, "Audio"),
    (1 << 22, "Telephony"),
    (1 << 23, "Information"),
];

/// Major device class values (bits 12..8, unshifted).
pub mod major {
    pub const MISCELLANEOUS: u32 = 0x0000;
    pub const COMPUTER: u32 = 0x0100;
    pub const PHONE: u32 = 0x0200;
    pub const LAN_NETWORK: u32 = 0x0300;
    pub const AUDIO_VIDEO: u32 = 0x0400;
    pub const PERIPHERAL: u32 = 0x0500;
    pub const IMAGING: u32 = 0x0600;
    pub const WEARABLE: u32 = 0x0700;
    pub const TOY: u32 = 0x0800;
    pub const HEALTH: u32 = 0x0900;
    pub const UNCATEGORIZED: u32 = 0x1F00;
}

const COMPUTER_MINOR: [&str; 8] = [
    "Uncategorized",
    "Desktop Workstation",
    "Server-class computer",
    "Laptop",
    "Handheld PC/PDA",
    "Palm-size PC/PDA",
    "Wearable computer",
    "Tablet",
];

const AUDIO_VIDEO_MINOR: [&str; 19] = [
    "Uncategorized",
    "Wearable Headset Device",
    "Hands-free Device",
    "Reserved (000011)",
    "Microphone",
    "Loudspeaker",
    "Headphones",
    "Portable Audio",
    "Car Audio",
    "Set-top box",
    "HiFi Audio Device",
    "VCR",
    "Video Camera",
    "Camcorder",
    "Video Monitor",
    "Video Display and Loudspeaker",
    "Video Conferencing",
    "Reserved (010001)",
    "Gaming/Toy",
];

/// Class of device, stored in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ClassOfDevice(pub [u8; 3]);

impl ClassOfDevice {
    /// Size in bytes.
    pub const SIZE: usize = 3;

    pub(crate) fn get(cur: &mut &[u8]) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        cur.copy_to_slice(&mut bytes);
        Self(bytes)
    }

    /// Build from a 24-bit value.
    pub fn from_bits(bits: u32) -> Self {
        let b = bits.to_le_bytes();
        Self([b[0], b[1], b[2]])
    }

    /// The 24-bit value.
    pub fn bits(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 0])
    }

    /// Check if the value uses format #1 (the only defined format).
    pub fn is_format_one(&self) -> bool {
        self.bits() & 0x03 == 0
    }

    /// Names of the major service classes that are set.
    pub fn major_service_classes(&self) -> Vec<&'static str> {
        let bits = self.bits();
        MAJOR_SERVICE_CLASSES
            .iter()
            .filter(|(mask, _)| bits & mask != 0)
            .map(|(_, name)| *name)
            .collect()
    }

    /// Major device class (bits 12..8, unshifted; compare with [`major`]).
    pub fn major_device_class(&self) -> u32 {
        self.bits() & 0x1F00
    }

    /// Minor device class (bits 7..2, shifted down).
    pub fn minor_device_class(&self) -> u8 {
        ((self.bits() & 0xFC) >> 2) as u8
    }

    /// Name of the major device class, `None` for reserved values.
    pub fn major_device_name(&self) -> Option<&'static str> {
        let name = match self.major_device_class() {
            major::MISCELLANEOUS => "Miscellaneous",
            major::COMPUTER => "Computer",
            major::PHONE => "Phone",
            major::LAN_NETWORK => "Lan/Network Access Point",
            major::AUDIO_VIDEO => "Audio/Video",
            major::PERIPHERAL => "Peripheral",
            major::IMAGING => "Imaging",
            major::WEARABLE => "Wearable",
            major::TOY => "Toy",
            major::HEALTH => "Health",
            major::UNCATEGORIZED => "Uncategorized",
            _ => return None,
        };
        Some(name)
    }

    /// Name of the minor device class where one is defined.
    ///
    /// Only the Computer and Audio/Video major classes are named.
    pub fn minor_device_name(&self) -> Option<&'static str> {
        let minor = self.minor_device_class() as usize;
        match self.major_device_class() {
            major::COMPUTER => COMPUTER_MINOR.get(minor).copied(),
            major::AUDIO_VIDEO => AUDIO_VIDEO_MINOR.get(minor).copied(),
            _ => None,
        }
    }
}

impl fmt::Display for ClassOfDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_format_one() {
            return write!(f, "CoD data {:#08x}", self.bits());
        }

        write!(
            f,
            "Format #1; Major Service Class: {}; Major Device Class: ",
            self.major_service_classes().join(", ")
        )?;
        match self.major_device_name() {
            Some(name) => f.write_str(name)?,
            None => write!(f, "Unknown Reserved Value {:#06x}", self.major_device_class())?,
        }
        if self.major_device_class() == major::MISCELLANEOUS {
            return Ok(());
        }
        match self.minor_device_name() {
            Some(name) => write!(f, "; Minor Device Class: {}", name),
            None => write!(f, "; Minor Device Class: {:#04x}", self.minor_device_class()),
        }
    }
}
