//! Frame struct with typed accessors.
//!
//! A frame is one complete packet: header plus payload. Commands travel
//! host to controller, events controller to host; both share this shape.
//!
//! # Example
//!
//! ```
//! use mgmt_adapter::protocol::{opcodes::command, Frame, WireRecord, NON_CONTROLLER};
//! use bytes::Bytes;
//!
//! let frame = Frame::command(command::READ_VERSION_INFORMATION, NON_CONTROLLER, Bytes::new()).unwrap();
//! assert_eq!(&frame.encode()[..], &[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x00]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, WireRecord, HEADER_SIZE};
use crate::error::DecodeError;

/// A complete protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

/// A frame sent to the controller.
pub type CommandFrame = Frame;

/// A frame received from the controller.
pub type EventFrame = Frame;

impl Frame {
    /// Create a frame from header and payload as given.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Build a command frame, deriving the header's payload length.
    ///
    /// Fails with `PayloadTooLarge` if the payload does not fit the 16-bit
    /// length field.
    pub fn command(code: u16, controller_index: u16, payload: Bytes) -> Result<Self, DecodeError> {
        let length = u16::try_from(payload.len()).map_err(|_| DecodeError::PayloadTooLarge {
            length: payload.len(),
            max: u16::MAX as usize,
        })?;
        Ok(Self {
            header: Header::new(code, controller_index, length),
            payload,
        })
    }

    /// Command or event code.
    #[inline]
    pub fn code(&self) -> u16 {
        self.header.code
    }

    /// Controller index.
    #[inline]
    pub fn controller_index(&self) -> u16 {
        self.header.controller_index
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

impl WireRecord for Frame {
    const SIZE: usize = HEADER_SIZE;

    /// Decode a whole packet. The header's payload length must match the
    /// bytes after it exactly.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(buf)?;
        let payload = &buf[HEADER_SIZE..];
        header.validate_length(payload.len())?;
        Ok(Self::new(header, Bytes::copy_from_slice(payload)))
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE + self.payload.len());
        self.header.encode_into(buf);
        buf.put_slice(&self.payload);
    }
}
