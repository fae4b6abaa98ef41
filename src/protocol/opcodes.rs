//! Command, event and status codes of the management protocol.
//!
//! Codes outside the declared ranges are rejected by the codec:
//!
//! | Kind    | Range           |
//! |---------|-----------------|
//! | Command | 0x0001 - 0x0043 |
//! | Event   | 0x0001 - 0x0025 |
//! | Status  | 0x00 - 0x14     |

/// Smallest valid command code.
pub const MIN_COMMAND_CODE: u16 = 0x0001;
/// Largest valid command code.
pub const MAX_COMMAND_CODE: u16 = 0x0043;
/// Smallest valid event code.
pub const MIN_EVENT_CODE: u16 = 0x0001;
/// Largest valid event code.
pub const MAX_EVENT_CODE: u16 = 0x0025;
/// Smallest valid status code.
pub const MIN_STATUS_CODE: u8 = 0x00;
/// Largest valid status code.
pub const MAX_STATUS_CODE: u8 = 0x14;

/// Command codes used by this crate.
pub mod command {
    pub const READ_VERSION_INFORMATION: u16 = 0x0001;
    pub const READ_SUPPORTED_COMMANDS: u16 = 0x0002;
    pub const READ_CONTROLLER_INDEX_LIST: u16 = 0x0003;
    pub const READ_CONTROLLER_INFORMATION: u16 = 0x0004;
    pub const SET_POWERED: u16 = 0x0005;
    pub const SET_DISCOVERABLE: u16 = 0x0006;
    pub const SET_CONNECTABLE: u16 = 0x0007;
    pub const SET_FAST_CONNECTABLE: u16 = 0x0008;
    pub const SET_BONDABLE: u16 = 0x0009;
    pub const SET_LINK_SECURITY: u16 = 0x000A;
    pub const SET_SECURE_SIMPLE_PAIRING: u16 = 0x000B;
    pub const SET_HIGH_SPEED: u16 = 0x000C;
    pub const SET_LOW_ENERGY: u16 = 0x000D;
    pub const SET_DEVICE_CLASS: u16 = 0x000E;
    pub const SET_LOCAL_NAME: u16 = 0x000F;
    pub const SET_ADVERTISING: u16 = 0x0029;
    pub const SET_BREDR: u16 = 0x002A;
    pub const SET_SECURE_CONNECTIONS: u16 = 0x002D;
    pub const SET_DEBUG_KEYS: u16 = 0x002E;
    pub const SET_PRIVACY: u16 = 0x002F;
    pub const SET_APPEARANCE: u16 = 0x0043;
}

/// Event codes used by this crate.
pub mod event {
    pub const COMMAND_COMPLETE: u16 = 0x0001;
    pub const COMMAND_STATUS: u16 = 0x0002;
    pub const CONTROLLER_ERROR: u16 = 0x0003;
    pub const NEW_SETTINGS: u16 = 0x0006;
    pub const CLASS_OF_DEVICE_CHANGED: u16 = 0x0007;
    pub const LOCAL_NAME_CHANGED: u16 = 0x0008;
    pub const DEVICE_CONNECTED: u16 = 0x000B;
    pub const DEVICE_DISCONNECTED: u16 = 0x000C;
}

/// Status codes used by this crate.
pub mod status {
    pub const SUCCESS: u8 = 0x00;
    pub const UNKNOWN_COMMAND: u8 = 0x01;
    pub const FAILED: u8 = 0x03;
    pub const BUSY: u8 = 0x0A;
    pub const NOT_SUPPORTED: u8 = 0x0C;
    pub const INVALID_PARAMETERS: u8 = 0x0D;
    pub const NOT_POWERED: u8 = 0x0F;
    pub const INVALID_INDEX: u8 = 0x11;
    pub const PERMISSION_DENIED: u8 = 0x14;
}

const COMMAND_NAMES: [&str; MAX_COMMAND_CODE as usize + 1] = [
    "Invalid Command",
    "Read Version Information Command",
    "Read Supported Commands Command",
    "Read Controller Index List Command",
    "Read Controller Information Command",
    "Set Powered Command",
    "Set Discoverable Command",
    "Set Connectable Command",
    "Set Fast Connectable Command",
    "Set Bondable Command",
    "Set Link Security Command",
    "Set Secure Simple Pairing Command",
    "Set High Speed Command",
    "Set Low Energy Command",
    "Set Device Class",
    "Set Local Name Command",
    "Add UUID Command",
    "Remove UUID Command",
    "Load Link Keys Command",
    "Load Long Term Keys Command",
    "Disconnect Command",
    "Get Connections Command",
    "PIN Code Reply Command",
    "PIN Code Negative Reply Command",
    "Set IO Capability Command",
    "Pair Device Command",
    "Cancel Pair Device Command",
    "Unpair Device Command",
    "User Confirmation Reply Command",
    "User Confirmation Negative Reply Command",
    "User Passkey Reply Command",
    "User Passkey Negative Reply Command",
    "Read Local Out Of Band Data Command",
    "Add Remote Out Of Band Data Command",
    "Remove Remote Out Of Band Data Command",
    "Start Discovery Command",
    "Stop Discovery Command",
    "Confirm Name Command",
    "Block Device Command",
    "Unblock Device Command",
    "Set Device ID Command",
    "Set Advertising Command",
    "Set BR/EDR Command",
    "Set Static Address Command",
    "Set Scan Parameters Command",
    "Set Secure Connections Command",
    "Set Debug Keys Command",
    "Set Privacy Command",
    "Load Identity Resolving Keys Command",
    "Get Connection Information Command",
    "Get Clock Information Command",
    "Add Device Command",
    "Remove Device Command",
    "Load Connection Parameters Command",
    "Read Unconfigured Controller Index List Command",
    "Read Controller Configuration Information Command",
    "Set External Configuration Command",
    "Set Public Address Command",
    "Start Service Discovery Command",
    "Read Local Out Of Band Extended Data Command",
    "Read Extended Controller Index List Command",
    "Read Advertising Features Command",
    "Add Advertising Command",
    "Remove Advertising Command",
    "Get Advertising Size Information Command",
    "Start Limited Discovery Command",
    "Read Extended Controller Information Command",
    // mgmt-api.txt lists this as 0x0042 as well; it follows the previous
    // entry in document order, so it is numbered 0x0043 here.
    "Set Appearance Command",
];

const EVENT_NAMES: [&str; MAX_EVENT_CODE as usize + 1] = [
    "Invalid Event",
    "Command Complete Event",
    "Command Status Event",
    "Controller Error Event",
    "Index Added Event",
    "Index Removed Event",
    "New Settings Event",
    "Class Of Device Changed Event",
    "Local Name Changed Event",
    "New Link Key Event",
    "New Long Term Key Event",
    "Device Connected Event",
    "Device Disconnected Event",
    "Connect Failed Event",
    "PIN Code Request Event",
    "User Confirmation Request Event",
    "User Passkey Request Event",
    "Authentication Failed Event",
    "Device Found Event",
    "Discovering Event",
    "Device Blocked Event",
    "Device Unblocked Event",
    "Device Unpaired Event",
    "Passkey Notify Event",
    "New Identity Resolving Key Event",
    "New Signature Resolving Key Event",
    "Device Added Event",
    "Device Removed Event",
    "New Connection Parameter Event",
    "Unconfigured Index Added Event",
    "Unconfigured Index Removed Event",
    "New Configuration Options Event",
    "Extended Index Added Event",
    "Extended Index Removed Event",
    "Local Out Of Band Extended Data Updated Event",
    "Advertising Added Event",
    "Advertising Removed Event",
    "Extended Controller Information Changed Event",
];

const STATUS_NAMES: [&str; MAX_STATUS_CODE as usize + 1] = [
    "Success",
    "Unknown Command",
    "Not Connected",
    "Failed",
    "Connect Failed",
    "Authentication Failed",
    "Not Paired",
    "No Resources",
    "Timeout",
    "Already Connected",
    "Busy",
    "Rejected",
    "Not Supported",
    "Invalid Parameters",
    "Disconnected",
    "Not Powered",
    "Cancelled",
    "Invalid Index",
    "RFKilled",
    "Already Paired",
    "Permission Denied",
];

/// Check if a command code is in the valid range.
#[inline]
pub fn is_valid_command(code: u16) -> bool {
    (MIN_COMMAND_CODE..=MAX_COMMAND_CODE).contains(&code)
}

/// Check if an event code is in the valid range.
#[inline]
pub fn is_valid_event(code: u16) -> bool {
    (MIN_EVENT_CODE..=MAX_EVENT_CODE).contains(&code)
}

/// Check if a status code is in the valid range.
#[inline]
pub fn is_valid_status(code: u8) -> bool {
    code <= MAX_STATUS_CODE
}

/// Name of a command code, `None` when out of range.
pub fn command_name(code: u16) -> Option<&'static str> {
    is_valid_command(code).then(|| COMMAND_NAMES[code as usize])
}

/// Name of an event code, `None` when out of range.
pub fn event_name(code: u16) -> Option<&'static str> {
    is_valid_event(code).then(|| EVENT_NAMES[code as usize])
}

/// Name of a status code, `None` when out of range.
pub fn status_name(code: u8) -> Option<&'static str> {
    is_valid_status(code).then(|| STATUS_NAMES[code as usize])
}
