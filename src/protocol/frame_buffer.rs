//! Frame buffer for accumulating partial reads.
//!
//! The control socket delivers one packet per read, but a stream transport
//! may split or merge packets arbitrarily. `FrameBuffer` restores packet
//! boundaries with a small state machine:
//! - `WaitingForHeader`: need at least 6 bytes
//! - `WaitingForPayload`: header seen, need the rest of the packet
//! - `Discarding`: header declared an oversized payload; skip it
//!
//! An oversized packet is reported once and then skipped by its declared
//! length, so framing stays aligned with the stream.
//!
//! Extracted packets are returned whole (header included) so they can be
//! handed to the dispatcher exactly as a datagram read would deliver them.
//!
//! # Example
//!
//! ```
//! use mgmt_adapter::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//! assert!(buffer.push(&[0x01, 0x00, 0xFF]).unwrap().is_empty());
//! let packets = buffer.push(&[0xFF, 0x00, 0x00]).unwrap();
//! assert_eq!(packets.len(), 1);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, WireRecord, HEADER_SIZE};
use crate::error::DecodeError;

/// State machine for packet extraction.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete header.
    WaitingForHeader,
    /// Header seen, waiting until `packet_len` bytes are buffered.
    WaitingForPayload { packet_len: usize },
    /// Dropping the rest of a rejected packet.
    Discarding { remaining: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete packets.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_payload_size: u16,
}

impl FrameBuffer {
    /// Create a frame buffer that accepts any 16-bit payload length.
    pub fn new() -> Self {
        Self::with_max_payload(u16::MAX)
    }

    /// Create a frame buffer with a custom max payload size.
    pub fn with_max_payload(max_payload_size: u16) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Append data without extracting anything.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete packets.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if a header declares more than the
    /// configured maximum. If complete packets precede that header, they
    /// are returned first and the error is reported by the next call.
    /// The oversized packet is then skipped.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>, DecodeError> {
        self.extend(data);

        let mut packets = Vec::new();
        loop {
            if !packets.is_empty() && self.oversized_header().is_some() {
                break;
            }
            match self.next_packet()? {
                Some(packet) => packets.push(packet),
                None => break,
            }
        }
        Ok(packets)
    }

    /// Extract the next complete packet from buffered data.
    ///
    /// Returns `Ok(None)` when more data is needed. After a
    /// `PayloadTooLarge` error, further calls skip the rejected packet and
    /// continue with the one after it.
    pub fn next_packet(&mut self) -> Result<Option<Bytes>, DecodeError> {
        if let State::Discarding { remaining } = self.state {
            let skip = remaining.min(self.buffer.len());
            let _ = self.buffer.split_to(skip);
            if skip < remaining {
                self.state = State::Discarding {
                    remaining: remaining - skip,
                };
                return Ok(None);
            }
            self.state = State::WaitingForHeader;
        }

        if let State::WaitingForHeader = self.state {
            if self.buffer.len() < HEADER_SIZE {
                return Ok(None);
            }

            if let Some(length) = self.oversized_header() {
                self.state = State::Discarding {
                    remaining: HEADER_SIZE + length,
                };
                return Err(DecodeError::PayloadTooLarge {
                    length,
                    max: self.max_payload_size as usize,
                });
            }

            let header = Header::decode(&self.buffer[..HEADER_SIZE])?;
            self.state = State::WaitingForPayload {
                packet_len: HEADER_SIZE + header.payload_length as usize,
            };
        }

        let State::WaitingForPayload { packet_len } = self.state else {
            return Ok(None);
        };
        if self.buffer.len() < packet_len {
            return Ok(None);
        }

        self.state = State::WaitingForHeader;
        Ok(Some(self.buffer.split_to(packet_len).freeze()))
    }

    /// Declared payload length of a buffered header over the limit.
    fn oversized_header(&self) -> Option<usize> {
        if !matches!(self.state, State::WaitingForHeader) || self.buffer.len() < HEADER_SIZE {
            return None;
        }
        let header = Header::decode(&self.buffer[..HEADER_SIZE]).ok()?;
        (header.payload_length > self.max_payload_size).then_some(header.payload_length as usize)
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
            State::Discarding { .. } => "Discarding",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
