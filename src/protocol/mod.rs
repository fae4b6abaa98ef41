//! Protocol module - wire format, records, events and framing.
//!
//! This module implements the management protocol's binary codec:
//! - 6-byte header encoding/decoding
//! - Command, event and status codes with their names
//! - Payload records and event records with length validation
//! - Frame buffer for restoring packet boundaries on byte streams

mod class_of_device;
mod events;
mod frame;
mod frame_buffer;
pub mod opcodes;
mod records;
mod wire_format;

pub use class_of_device::{major, ClassOfDevice};
pub use events::{
    ClassOfDeviceChangedEvent, CommandCompleteEvent, CommandStatusEvent, DeviceConnectedEvent,
    DeviceDisconnectedEvent, LocalNameChangedEvent, NewSettingsEvent,
};
pub use frame::{CommandFrame, EventFrame, Frame};
pub use frame_buffer::FrameBuffer;
pub use opcodes::{command_name, event_name, status_name};
pub use records::{
    truncate_text, Address, AdapterSettings, ControllerInformation, LocalName,
    VersionInformation, ADDRESS_SIZE, NAME_SIZE, SHORT_NAME_SIZE,
};
pub use wire_format::{
    decode, decode_exact, encode, Header, WireRecord, HEADER_SIZE, NON_CONTROLLER,
};
