//! Error types for mgmt-adapter.

use thiserror::Error;

/// Failure to decode a record from the wire.
///
/// Decode errors never escape the event dispatcher: a frame that fails to
/// decode is logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than the fixed size of the record.
    #[error("Record too short: need {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// A declared length disagrees with the bytes actually present.
    #[error("Length mismatch: declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Event code outside 0x0001-0x0025.
    #[error("Invalid event code: {0:#06x}")]
    InvalidEventCode(u16),

    /// Command code outside 0x0001-0x0043.
    #[error("Invalid command code: {0:#06x}")]
    InvalidCommandCode(u16),

    /// Status code outside 0x00-0x14.
    #[error("Invalid status code: {0:#04x}")]
    InvalidStatus(u8),

    /// Stream framing saw a payload length above the configured maximum.
    #[error("Payload size {length} exceeds maximum {max}")]
    PayloadTooLarge { length: usize, max: usize },
}

/// Main error type for adapter operations.
#[derive(Debug, Error)]
pub enum MgmtError {
    /// I/O error on the control channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed data on the control channel.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The control channel reached end of stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The control channel is not connected and cannot connect itself.
    #[error("Transport not connected")]
    NotConnected,

    /// `start()` was called while the event dispatcher was running.
    #[error("Event dispatcher already running")]
    AlreadyRunning,

    /// Refused to send a command code outside the known range.
    #[error("Invalid command code: {0:#06x}")]
    InvalidCommand(u16),

    /// No response for the command arrived in time.
    #[error("Timed out waiting for response to command {0:#06x}")]
    Timeout(u16),
}

/// Result type alias using MgmtError.
pub type Result<T> = std::result::Result<T, MgmtError>;
