//! Adapter and transport configuration.
//!
//! Both configs have working defaults and can be read from JSON, e.g.
//!
//! ```
//! use mgmt_adapter::config::AdapterConfig;
//! use std::time::Duration;
//!
//! let config = AdapterConfig::from_json(r#"{"command_timeout_ms": 250}"#).unwrap();
//! assert_eq!(config.command_timeout, Duration::from_millis(250));
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// Default time to wait for the response to a command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default size of a single transport read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Configuration of the command sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// How long `send_command` waits for the matching response.
    #[serde(rename = "command_timeout_ms", deserialize_with = "millis")]
    pub command_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl AdapterConfig {
    /// Parse from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration of a byte-stream transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes requested per read from the stream.
    pub read_buffer_size: usize,
    /// Largest payload length accepted from a packet header.
    pub max_payload_size: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_payload_size: u16::MAX,
        }
    }
}

impl StreamConfig {
    /// Parse from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MgmtError;

    #[test]
    fn test_adapter_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.command_timeout, Duration::from_millis(1000));
        assert_eq!(AdapterConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_adapter_from_json() {
        let config = AdapterConfig::from_json(r#"{"command_timeout_ms": 50}"#).unwrap();
        assert_eq!(config.command_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_adapter_from_invalid_json() {
        let err = AdapterConfig::from_json(r#"{"command_timeout_ms": "soon"}"#).unwrap_err();
        assert!(matches!(err, MgmtError::Config(_)));
        assert!(err.to_string().starts_with("Config error"));
    }

    #[test]
    fn test_stream_from_json() {
        let config = StreamConfig::from_json(r#"{"max_payload_size": 512}"#).unwrap();
        assert_eq!(config.max_payload_size, 512);
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);

        assert!(StreamConfig::from_json(r#"{"max_payload_size": 70000}"#).is_err());
    }
}
