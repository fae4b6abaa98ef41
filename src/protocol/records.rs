//! Payload records carried by command complete and notification events.
//!
//! Layouts (Little Endian):
//! ```text
//! AdapterSettings        masks:u32
//! VersionInformation     version:u8 revision:u16
//! LocalName              name:char[249] short_name:char[11]
//! ControllerInformation  address:u8[6] version:u8 manufacturer:u16
//!                        supported:u32 current:u32 class:u8[3]
//!                        name:char[249] short_name:char[11]
//! ```

use std::fmt;

use bitflags::bitflags;
use bytes::{Buf, BufMut, BytesMut};

use super::class_of_device::ClassOfDevice;
use super::wire_format::{ensure_len, WireRecord};
use crate::error::DecodeError;

/// Size of the name field, including the terminating zero.
pub const NAME_SIZE: usize = 249;

/// Size of the short name field, including the terminating zero.
pub const SHORT_NAME_SIZE: usize = 11;

/// Size of a device address.
pub const ADDRESS_SIZE: usize = 6;

/// Read a zero-terminated text field of `len` bytes.
///
/// Everything from the first zero byte on is ignored.
pub(crate) fn get_text(cur: &mut &[u8], len: usize) -> String {
    let field = &cur[..len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    let text = String::from_utf8_lossy(&field[..end]).into_owned();
    cur.advance(len);
    text
}

/// Write `text` into a zero-padded field of `len` bytes.
///
/// The text is cut at a char boundary so the terminating zero always fits.
pub(crate) fn put_text(buf: &mut BytesMut, text: &str, len: usize) {
    let text = truncate_text(text, len - 1);
    buf.put_slice(text.as_bytes());
    buf.put_bytes(0, len - text.len());
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char.
pub fn truncate_text(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Controller (device) address, stored in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    pub(crate) fn get(cur: &mut &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE];
        cur.copy_to_slice(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    /// Most significant byte first, as controllers print addresses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

bitflags! {
    /// Capability and state flags of a controller.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AdapterSettings: u32 {
        const POWERED = 1 << 0;
        const CONNECTABLE = 1 << 1;
        const FAST_CONNECTABLE = 1 << 2;
        const DISCOVERABLE = 1 << 3;
        const BONDABLE = 1 << 4;
        const LINK_LEVEL_SECURITY = 1 << 5;
        const SECURE_SIMPLE_PAIRING = 1 << 6;
        const BREDR = 1 << 7;
        const HIGH_SPEED = 1 << 8;
        const LOW_ENERGY = 1 << 9;
        const ADVERTISING = 1 << 10;
        const SECURE_CONNECTIONS = 1 << 11;
        const DEBUG_KEYS = 1 << 12;
        const PRIVACY = 1 << 13;
        const CONTROLLER_CONFIGURATION = 1 << 14;
        const STATIC_ADDRESS = 1 << 15;
    }
}

impl AdapterSettings {
    const SHORT_NAMES: [(Self, &'static str); 16] = [
        (Self::POWERED, "Powered"),
        (Self::CONNECTABLE, "Connectable"),
        (Self::FAST_CONNECTABLE, "FC"),
        (Self::DISCOVERABLE, "Discov"),
        (Self::BONDABLE, "Bondable"),
        (Self::LINK_LEVEL_SECURITY, "LLS"),
        (Self::SECURE_SIMPLE_PAIRING, "SSP"),
        (Self::BREDR, "BR/EDR"),
        (Self::HIGH_SPEED, "HS"),
        (Self::LOW_ENERGY, "LE"),
        (Self::ADVERTISING, "Adv"),
        (Self::SECURE_CONNECTIONS, "SC"),
        (Self::DEBUG_KEYS, "DebugKeys"),
        (Self::PRIVACY, "Privacy"),
        (Self::CONTROLLER_CONFIGURATION, "ControllerConfig"),
        (Self::STATIC_ADDRESS, "StaticAddr"),
    ];
}

impl fmt::Display for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::SHORT_NAMES {
            if !self.contains(flag) {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl WireRecord for AdapterSettings {
    const SIZE: usize = 4;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, Self::SIZE)?;
        let mut cur = buf;
        // Undefined bits are kept so a round trip is lossless.
        Ok(Self::from_bits_retain(cur.get_u32_le()))
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.bits());
    }
}

/// Response to the read version information command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionInformation {
    pub version: u8,
    pub revision: u16,
}

impl WireRecord for VersionInformation {
    const SIZE: usize = 3;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, Self::SIZE)?;
        let mut cur = buf;
        Ok(Self {
            version: cur.get_u8(),
            revision: cur.get_u16_le(),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u16_le(self.revision);
    }
}

/// Controller name and short name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalName {
    pub name: String,
    pub short_name: String,
}

impl LocalName {
    /// Create a local name, truncating both parts to what the wire can carry.
    pub fn new(name: &str, short_name: &str) -> Self {
        Self {
            name: truncate_text(name, NAME_SIZE - 1).to_string(),
            short_name: truncate_text(short_name, SHORT_NAME_SIZE - 1).to_string(),
        }
    }
}

impl WireRecord for LocalName {
    const SIZE: usize = NAME_SIZE + SHORT_NAME_SIZE;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, Self::SIZE)?;
        let mut cur = buf;
        Ok(Self {
            name: get_text(&mut cur, NAME_SIZE),
            short_name: get_text(&mut cur, SHORT_NAME_SIZE),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        put_text(buf, &self.name, NAME_SIZE);
        put_text(buf, &self.short_name, SHORT_NAME_SIZE);
    }
}

/// Response to the read controller information command.
///
/// Some values are only meaningful in certain controller states; see
/// mgmt-api.txt in the BlueZ tree for the details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerInformation {
    pub address: Address,
    pub version: u8,
    pub manufacturer: u16,
    pub supported_settings: AdapterSettings,
    pub current_settings: AdapterSettings,
    pub class_of_device: ClassOfDevice,
    pub name: String,
    pub short_name: String,
}

impl WireRecord for ControllerInformation {
    const SIZE: usize = ADDRESS_SIZE + 1 + 2 + 4 + 4 + 3 + NAME_SIZE + SHORT_NAME_SIZE;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, Self::SIZE)?;
        let mut cur = buf;
        Ok(Self {
            address: Address::get(&mut cur),
            version: cur.get_u8(),
            manufacturer: cur.get_u16_le(),
            supported_settings: AdapterSettings::from_bits_retain(cur.get_u32_le()),
            current_settings: AdapterSettings::from_bits_retain(cur.get_u32_le()),
            class_of_device: ClassOfDevice::get(&mut cur),
            name: get_text(&mut cur, NAME_SIZE),
            short_name: get_text(&mut cur, SHORT_NAME_SIZE),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.address.0);
        buf.put_u8(self.version);
        buf.put_u16_le(self.manufacturer);
        buf.put_u32_le(self.supported_settings.bits());
        buf.put_u32_le(self.current_settings.bits());
        buf.put_slice(&self.class_of_device.0);
        put_text(buf, &self.name, NAME_SIZE);
        put_text(buf, &self.short_name, SHORT_NAME_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> ControllerInformation {
        ControllerInformation {
            address: Address([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]),
            version: 8,
            manufacturer: 0x000F,
            supported_settings: AdapterSettings::all(),
            current_settings: AdapterSettings::POWERED | AdapterSettings::LOW_ENERGY,
            class_of_device: ClassOfDevice([0x0C, 0x01, 0x00]),
            name: "raspberrypi".to_string(),
            short_name: "rpi".to_string(),
        }
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(AdapterSettings::SIZE, 4);
        assert_eq!(VersionInformation::SIZE, 3);
        assert_eq!(LocalName::SIZE, 260);
        assert_eq!(ControllerInformation::SIZE, 280);
    }

    #[test]
    fn test_settings_powered_and_le() {
        let encoded = (AdapterSettings::POWERED | AdapterSettings::LOW_ENERGY).encode();
        assert_eq!(&encoded[..], &[0x01, 0x02, 0x00, 0x00]);

        let decoded = AdapterSettings::decode(&encoded).unwrap();
        assert_eq!(decoded.bits(), 0x0201);
        let active: Vec<_> = decoded.iter().collect();
        assert_eq!(
            active,
            vec![AdapterSettings::POWERED, AdapterSettings::LOW_ENERGY]
        );
        assert_eq!(decoded.to_string(), "Powered, LE");
    }

    #[test]
    fn test_settings_display_empty() {
        assert_eq!(AdapterSettings::empty().to_string(), "");
    }

    #[test]
    fn test_settings_keep_unknown_bits() {
        let decoded = AdapterSettings::decode(&[0x01, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(decoded.bits(), 0x0001_0001);
        assert!(decoded.contains(AdapterSettings::POWERED));
        assert_eq!(decoded.encode().as_ref(), &[0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_version_little_endian() {
        let decoded = VersionInformation::decode(&[1, 0x0E, 0x00]).unwrap();
        assert_eq!(
            decoded,
            VersionInformation {
                version: 1,
                revision: 14
            }
        );
    }

    #[test]
    fn test_records_too_short() {
        assert_eq!(
            VersionInformation::decode(&[1, 2]),
            Err(DecodeError::TooShort {
                expected: 3,
                actual: 2
            })
        );
        assert!(AdapterSettings::decode(&[0; 3]).is_err());
        assert!(LocalName::decode(&[0; 259]).is_err());
        assert!(ControllerInformation::decode(&[0; 279]).is_err());
        assert!(ControllerInformation::decode(&[]).is_err());
    }

    #[test]
    fn test_controller_information_roundtrip() {
        let info = sample_info();
        let encoded = info.encode();
        assert_eq!(encoded.len(), ControllerInformation::SIZE);
        assert_eq!(ControllerInformation::decode(&encoded).unwrap(), info);
    }

    #[test]
    fn test_controller_information_field_offsets() {
        let encoded = sample_info().encode();
        assert_eq!(&encoded[0..6], &[0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(encoded[6], 8);
        assert_eq!(&encoded[7..9], &[0x0F, 0x00]);
        assert_eq!(&encoded[13..17], &[0x01, 0x02, 0x00, 0x00]);
        assert_eq!(&encoded[17..20], &[0x0C, 0x01, 0x00]);
        assert_eq!(&encoded[20..31], b"raspberrypi");
        assert_eq!(encoded[31], 0);
    }

    #[test]
    fn test_name_stops_at_first_zero() {
        let mut encoded = BytesMut::from(&sample_info().encode()[..]);
        // "raspberrypi\0" followed by garbage in the padding
        encoded[32..40].copy_from_slice(b"GARBAGE!");

        let decoded = ControllerInformation::decode(&encoded).unwrap();
        assert_eq!(decoded.name, "raspberrypi");
        assert_eq!(decoded.short_name, "rpi");
    }

    #[test]
    fn test_name_without_terminator_uses_whole_field() {
        let mut buf = vec![b'x'; NAME_SIZE];
        buf.extend_from_slice(&[0u8; SHORT_NAME_SIZE]);
        let decoded = LocalName::decode(&buf).unwrap();
        assert_eq!(decoded.name.len(), NAME_SIZE);
        assert!(decoded.short_name.is_empty());
    }

    #[test]
    fn test_local_name_truncates() {
        let long = "n".repeat(400);
        let name = LocalName::new(&long, "a very long short name");
        assert_eq!(name.name.len(), NAME_SIZE - 1);
        assert_eq!(name.short_name, "a very lon");

        let encoded = name.encode();
        assert_eq!(encoded.len(), LocalName::SIZE);
        assert_eq!(encoded[NAME_SIZE - 1], 0);
        assert_eq!(LocalName::decode(&encoded).unwrap(), name);
    }

    #[test]
    fn test_truncate_text_char_boundary() {
        // 'é' is two bytes; cutting at 3 would split it
        assert_eq!(truncate_text("abé", 3), "ab");
        assert_eq!(truncate_text("abé", 4), "abé");
        assert_eq!(truncate_text("", 0), "");
    }

    #[test]
    fn test_address_display() {
        let address = Address([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(address.to_string(), "11:22:33:44:55:66");
    }
}
