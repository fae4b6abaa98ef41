//! Wire format encoding and decoding.
//!
//! Every packet starts with the 6-byte header:
//! ```text
//! ┌──────────┬──────────────────┬────────────────┐
//! │ Code     │ Controller Index │ Payload Length │
//! │ 2 bytes  │ 2 bytes          │ 2 bytes        │
//! │ uint16 LE│ uint16 LE        │ uint16 LE      │
//! └──────────┴──────────────────┴────────────────┘
//! ```
//!
//! All multi-byte integers are Little Endian (the controller's byte order).
//! Records are decoded field by field after a length check; nothing is
//! overlaid onto raw memory.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Controller index for commands that are not bound to a controller.
pub const NON_CONTROLLER: u16 = 0xFFFF;

/// A fixed-layout record with an explicit wire encoding.
///
/// `SIZE` is the size of the fixed part. Records with a variable tail
/// (frames, command complete events) read the tail from the bytes that
/// follow it.
pub trait WireRecord: Sized {
    /// Size of the fixed part in bytes.
    const SIZE: usize;

    /// Decode from wire bytes.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError>;

    /// Append the wire encoding to `buf`.
    fn encode_into(&self, buf: &mut BytesMut);

    /// Encode to a new buffer.
    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Encode a record (standalone function).
#[inline]
pub fn encode<T: WireRecord>(record: &T) -> Bytes {
    record.encode()
}

/// Decode a record (standalone function).
#[inline]
pub fn decode<T: WireRecord>(buf: &[u8]) -> Result<T, DecodeError> {
    T::decode(buf)
}

/// Decode a record that must fill `buf` exactly.
///
/// Used for payloads whose shape is fixed by the command they answer.
pub fn decode_exact<T: WireRecord>(buf: &[u8]) -> Result<T, DecodeError> {
    ensure_exact_len(buf, T::SIZE)?;
    T::decode(buf)
}

/// Fail with `TooShort` unless `buf` holds at least `expected` bytes.
#[inline]
pub(crate) fn ensure_len(buf: &[u8], expected: usize) -> Result<(), DecodeError> {
    if buf.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Fail with `LengthMismatch` unless `buf` holds exactly `expected` bytes.
#[inline]
pub(crate) fn ensure_exact_len(buf: &[u8], expected: usize) -> Result<(), DecodeError> {
    if buf.len() != expected {
        return Err(DecodeError::LengthMismatch {
            declared: expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Command code (host to controller) or event code (controller to host).
    pub code: u16,
    /// Controller the packet applies to, or [`NON_CONTROLLER`].
    pub controller_index: u16,
    /// Number of payload bytes following the header.
    pub payload_length: u16,
}

impl Header {
    /// Create a new header.
    pub fn new(code: u16, controller_index: u16, payload_length: u16) -> Self {
        Self {
            code,
            controller_index,
            payload_length,
        }
    }

    /// Read the leading code of a packet without decoding the rest.
    ///
    /// Returns `None` if fewer than 2 bytes are available.
    pub fn peek_code(buf: &[u8]) -> Option<u16> {
        if buf.len() < 2 {
            return None;
        }
        Some(u16::from_le_bytes([buf[0], buf[1]]))
    }

    /// Check that the declared payload length matches what is actually
    /// present after the header.
    pub fn validate_length(&self, actual_payload: usize) -> Result<(), DecodeError> {
        if self.payload_length as usize != actual_payload {
            return Err(DecodeError::LengthMismatch {
                declared: self.payload_length as usize,
                actual: actual_payload,
            });
        }
        Ok(())
    }

    /// Check if this header is not bound to a controller.
    #[inline]
    pub fn is_non_controller(&self) -> bool {
        self.controller_index == NON_CONTROLLER
    }
}

impl WireRecord for Header {
    const SIZE: usize = HEADER_SIZE;

    /// Decode a header from the first 6 bytes of `buf`.
    ///
    /// Only the header itself is checked here; use
    /// [`Header::validate_length`] against the full packet.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, HEADER_SIZE)?;
        let mut cur = &buf[..HEADER_SIZE];
        Ok(Self {
            code: cur.get_u16_le(),
            controller_index: cur.get_u16_le(),
            payload_length: cur.get_u16_le(),
        })
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.code);
        buf.put_u16_le(self.controller_index);
        buf.put_u16_le(self.payload_length);
    }
}
