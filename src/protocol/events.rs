//! Event records sent by the controller.
//!
//! Every event is a [`Header`] followed by an event-specific body. Decoding
//! checks the fixed size first, then that the header's payload length
//! matches the bytes actually present, then the range of any embedded
//! command or status code.
//!
//! ```text
//! CommandComplete      header code:u16 status:u8 payload[..]
//! CommandStatus        header code:u16 status:u8
//! DeviceConnected      header address:u8[6] type:u8 flags:u32 eir_len:u16 eir[eir_len]
//! DeviceDisconnected   header address:u8[6] type:u8 reason:u8
//! ClassOfDeviceChanged header class:u8[3]
//! NewSettings          header settings:u32
//! LocalNameChanged     header name:char[249] short_name:char[11]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::class_of_device::ClassOfDevice;
use super::opcodes::{event, is_valid_command, is_valid_status};
use super::records::{Address, AdapterSettings, LocalName, ADDRESS_SIZE};
use super::wire_format::{ensure_exact_len, ensure_len, Header, WireRecord, HEADER_SIZE};
use crate::error::DecodeError;

/// Decode and length-check the header of an event with a `fixed`-byte
/// minimum size. Returns the header and the bytes after it.
fn split_event(buf: &[u8], fixed: usize) -> Result<(Header, &[u8]), DecodeError> {
    ensure_len(buf, fixed)?;
    let header = Header::decode(buf)?;
    let body = &buf[HEADER_SIZE..];
    header.validate_length(body.len())?;
    Ok((header, body))
}

fn checked_codes(command_code: u16, status: u8) -> Result<(), DecodeError> {
    if !is_valid_command(command_code) {
        return Err(DecodeError::InvalidCommandCode(command_code));
    }
    if !is_valid_status(status) {
        return Err(DecodeError::InvalidStatus(status));
    }
    Ok(())
}

/// Largest variable tail that fits a body with `fixed_body` bytes before it.
fn max_tail(fixed_body: usize) -> usize {
    u16::MAX as usize - fixed_body
}

/// Cut `tail` so the whole body length fits the header's u16 field.
fn fit_tail(mut tail: Bytes, fixed_body: usize) -> Bytes {
    let max = max_tail(fixed_body);
    if tail.len() > max {
        tracing::warn!("Truncating event data from {} to {} bytes", tail.len(), max);
        tail.truncate(max);
    }
    tail
}

/// Header for a body of `body_len` bytes; callers bound it with [`fit_tail`].
fn event_header(code: u16, controller_index: u16, body_len: usize) -> Header {
    let length = u16::try_from(body_len).unwrap_or(u16::MAX);
    Header::new(code, controller_index, length)
}

/// Completion of a command, with a payload shaped by `command_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompleteEvent {
    pub header: Header,
    /// The command this event completes.
    pub command_code: u16,
    pub status: u8,
    /// Return parameters of the command.
    pub payload: Bytes,
}

impl CommandCompleteEvent {
    /// Create an event; the header length is computed from the payload.
    ///
    /// A payload longer than 65532 bytes is truncated to fit the header.
    pub fn new(controller_index: u16, command_code: u16, status: u8, payload: Bytes) -> Self {
        let payload = fit_tail(payload, 3);
        Self {
            header: event_header(event::COMMAND_COMPLETE, controller_index, 3 + payload.len()),
            command_code,
            status,
            payload,
        }
    }
}

impl WireRecord for CommandCompleteEvent {
    const SIZE: usize = HEADER_SIZE + 3;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut body) = split_event(buf, Self::SIZE)?;
        let command_code = body.get_u16_le();
        let status = body.get_u8();
        checked_codes(command_code, status)?;
        Ok(Self {
            header,
            command_code,
            status,
            payload: Bytes::copy_from_slice(body),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        buf.put_u16_le(self.command_code);
        buf.put_u8(self.status);
        buf.put_slice(&self.payload);
    }
}

/// Status of a command that completes later (or failed early).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatusEvent {
    pub header: Header,
    pub command_code: u16,
    pub status: u8,
}

impl CommandStatusEvent {
    pub fn new(controller_index: u16, command_code: u16, status: u8) -> Self {
        Self {
            header: event_header(event::COMMAND_STATUS, controller_index, 3),
            command_code,
            status,
        }
    }
}

impl WireRecord for CommandStatusEvent {
    const SIZE: usize = HEADER_SIZE + 3;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut body) = split_event(buf, Self::SIZE)?;
        ensure_exact_len(body, 3)?;
        let command_code = body.get_u16_le();
        let status = body.get_u8();
        checked_codes(command_code, status)?;
        Ok(Self {
            header,
            command_code,
            status,
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        buf.put_u16_le(self.command_code);
        buf.put_u8(self.status);
    }
}

/// A remote device connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConnectedEvent {
    pub header: Header,
    pub address: Address,
    pub address_type: u8,
    pub flags: u32,
    /// Extended inquiry response / advertising data.
    pub eir_data: Bytes,
}

impl DeviceConnectedEvent {
    pub fn new(
        controller_index: u16,
        address: Address,
        address_type: u8,
        flags: u32,
        eir_data: Bytes,
    ) -> Self {
        let eir_data = fit_tail(eir_data, Self::SIZE - HEADER_SIZE);
        let body_len = Self::SIZE - HEADER_SIZE + eir_data.len();
        Self {
            header: event_header(event::DEVICE_CONNECTED, controller_index, body_len),
            address,
            address_type,
            flags,
            eir_data,
        }
    }
}

impl WireRecord for DeviceConnectedEvent {
    const SIZE: usize = HEADER_SIZE + ADDRESS_SIZE + 1 + 4 + 2;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut body) = split_event(buf, Self::SIZE)?;
        let address = Address::get(&mut body);
        let address_type = body.get_u8();
        let flags = body.get_u32_le();
        let eir_len = body.get_u16_le() as usize;
        ensure_exact_len(body, eir_len)?;
        Ok(Self {
            header,
            address,
            address_type,
            flags,
            eir_data: Bytes::copy_from_slice(body),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        buf.put_slice(&self.address.0);
        buf.put_u8(self.address_type);
        buf.put_u32_le(self.flags);
        let eir_len = u16::try_from(self.eir_data.len()).unwrap_or(u16::MAX);
        buf.put_u16_le(eir_len);
        buf.put_slice(&self.eir_data);
    }
}

/// A remote device disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDisconnectedEvent {
    pub header: Header,
    pub address: Address,
    pub address_type: u8,
    pub reason: u8,
}

impl DeviceDisconnectedEvent {
    pub fn new(controller_index: u16, address: Address, address_type: u8, reason: u8) -> Self {
        Self {
            header: event_header(event::DEVICE_DISCONNECTED, controller_index, 8),
            address,
            address_type,
            reason,
        }
    }
}

impl WireRecord for DeviceDisconnectedEvent {
    const SIZE: usize = HEADER_SIZE + ADDRESS_SIZE + 2;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut body) = split_event(buf, Self::SIZE)?;
        ensure_exact_len(body, Self::SIZE - HEADER_SIZE)?;
        Ok(Self {
            header,
            address: Address::get(&mut body),
            address_type: body.get_u8(),
            reason: body.get_u8(),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        buf.put_slice(&self.address.0);
        buf.put_u8(self.address_type);
        buf.put_u8(self.reason);
    }
}

/// The controller's class of device changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassOfDeviceChangedEvent {
    pub header: Header,
    pub class_of_device: ClassOfDevice,
}

impl ClassOfDeviceChangedEvent {
    pub fn new(controller_index: u16, class_of_device: ClassOfDevice) -> Self {
        Self {
            header: event_header(
                event::CLASS_OF_DEVICE_CHANGED,
                controller_index,
                ClassOfDevice::SIZE,
            ),
            class_of_device,
        }
    }
}

impl WireRecord for ClassOfDeviceChangedEvent {
    const SIZE: usize = HEADER_SIZE + ClassOfDevice::SIZE;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut body) = split_event(buf, Self::SIZE)?;
        ensure_exact_len(body, ClassOfDevice::SIZE)?;
        Ok(Self {
            header,
            class_of_device: ClassOfDevice::get(&mut body),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        buf.put_slice(&self.class_of_device.0);
    }
}

/// The controller's current settings changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSettingsEvent {
    pub header: Header,
    pub settings: AdapterSettings,
}

impl NewSettingsEvent {
    pub fn new(controller_index: u16, settings: AdapterSettings) -> Self {
        Self {
            header: event_header(event::NEW_SETTINGS, controller_index, AdapterSettings::SIZE),
            settings,
        }
    }
}

impl WireRecord for NewSettingsEvent {
    const SIZE: usize = HEADER_SIZE + AdapterSettings::SIZE;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, body) = split_event(buf, Self::SIZE)?;
        ensure_exact_len(body, AdapterSettings::SIZE)?;
        Ok(Self {
            header,
            settings: AdapterSettings::decode(body)?,
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        self.settings.encode_into(buf);
    }
}

/// The controller's local name changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNameChangedEvent {
    pub header: Header,
    pub local_name: LocalName,
}

impl LocalNameChangedEvent {
    pub fn new(controller_index: u16, local_name: LocalName) -> Self {
        Self {
            header: event_header(event::LOCAL_NAME_CHANGED, controller_index, LocalName::SIZE),
            local_name,
        }
    }
}

impl WireRecord for LocalNameChangedEvent {
    const SIZE: usize = HEADER_SIZE + LocalName::SIZE;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (header, body) = split_event(buf, Self::SIZE)?;
        ensure_exact_len(body, LocalName::SIZE)?;
        Ok(Self {
            header,
            local_name: LocalName::decode(body)?,
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        self.header.encode_into(buf);
        self.local_name.encode_into(buf);
    }
}
