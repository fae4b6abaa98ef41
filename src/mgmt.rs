//! Configuration commands for one controller.
//!
//! Thin wrappers over [`Adapter::send_command`] that build the documented
//! payloads. Every call waits for the controller's response; the new
//! settings are then visible through [`Adapter::settings`].
//!
//! | Call                     | Payload                              |
//! |--------------------------|--------------------------------------|
//! | `set_powered` and co.    | `0x00` off, `0x01` on                |
//! | `set_secure_connections` | `0x00` off, `0x01` on, `0x02` only   |
//! | `set_advertising`        | `0x00` off, `0x01` on, `0x02` conn.  |
//! | `set_discoverable`       | mode:u8 timeout:u16                  |
//! | `set_name`               | name:char[249] short_name:char[11]   |

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::adapter::Adapter;
use crate::error::Result;
use crate::protocol::opcodes::command;
use crate::protocol::{LocalName, WireRecord};
use crate::state::AdapterSnapshot;
use crate::transport::Transport;

/// Commands scoped to one controller index.
pub struct Mgmt<T: Transport> {
    adapter: Arc<Adapter<T>>,
    controller_index: u16,
}

impl<T: Transport> Clone for Mgmt<T> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            controller_index: self.controller_index,
        }
    }
}

impl<T: Transport> Mgmt<T> {
    pub fn new(adapter: Arc<Adapter<T>>, controller_index: u16) -> Self {
        Self {
            adapter,
            controller_index,
        }
    }

    pub fn controller_index(&self) -> u16 {
        self.controller_index
    }

    pub fn adapter(&self) -> &Arc<Adapter<T>> {
        &self.adapter
    }

    async fn set_state(&self, code: u16, value: u8) -> Result<()> {
        self.adapter
            .send_command(code, self.controller_index, Bytes::copy_from_slice(&[value]))
            .await
    }

    pub async fn set_powered(&self, on: bool) -> Result<()> {
        self.set_state(command::SET_POWERED, on as u8).await
    }

    /// Enable or disable BR/EDR (classic) operation.
    pub async fn set_bredr(&self, on: bool) -> Result<()> {
        self.set_state(command::SET_BREDR, on as u8).await
    }

    pub async fn set_bondable(&self, on: bool) -> Result<()> {
        self.set_state(command::SET_BONDABLE, on as u8).await
    }

    pub async fn set_connectable(&self, on: bool) -> Result<()> {
        self.set_state(command::SET_CONNECTABLE, on as u8).await
    }

    /// Enable or disable Low Energy.
    pub async fn set_le(&self, on: bool) -> Result<()> {
        self.set_state(command::SET_LOW_ENERGY, on as u8).await
    }

    /// `0` disables, `1` enables, `2` enables secure connections only.
    pub async fn set_secure_connections(&self, mode: u8) -> Result<()> {
        self.set_state(command::SET_SECURE_CONNECTIONS, mode).await
    }

    /// `0` disables, `1` enables, `2` enables connectable advertising.
    pub async fn set_advertising(&self, mode: u8) -> Result<()> {
        self.set_state(command::SET_ADVERTISING, mode).await
    }

    /// `mode`: `0` off, `1` general, `2` limited. `timeout_secs` of zero
    /// means no timeout.
    pub async fn set_discoverable(&self, mode: u8, timeout_secs: u16) -> Result<()> {
        let mut payload = BytesMut::with_capacity(3);
        payload.put_u8(mode);
        payload.put_u16_le(timeout_secs);
        self.adapter
            .send_command(command::SET_DISCOVERABLE, self.controller_index, payload.freeze())
            .await
    }

    /// Set the controller name. Names longer than the wire fields allow
    /// (248 and 10 bytes) are truncated.
    pub async fn set_name(&self, name: &str, short_name: &str) -> Result<()> {
        let local_name = LocalName::new(name, short_name);
        if local_name.name.len() < name.len() || local_name.short_name.len() < short_name.len() {
            tracing::debug!(
                "Truncated local name to {:?} ({:?})",
                local_name.name,
                local_name.short_name
            );
        }
        self.adapter
            .send_command(command::SET_LOCAL_NAME, self.controller_index, local_name.encode())
            .await
    }

    /// Refresh version and controller information, then return the store.
    pub async fn read_local_state(&self) -> AdapterSnapshot {
        self.adapter.sync(self.controller_index).await;
        self.adapter.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::opcodes::status;
    use crate::protocol::{
        AdapterSettings, CommandCompleteEvent, Frame, FrameBuffer, NAME_SIZE, SHORT_NAME_SIZE,
    };
    use crate::transport::StreamTransport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Read one command from the controller side and answer it.
    async fn answer(far: &mut DuplexStream, reply: impl FnOnce(&Frame) -> Bytes) -> Frame {
        let mut frames = FrameBuffer::new();
        let mut buf = [0u8; 512];
        let packet = loop {
            let n = far.read(&mut buf).await.unwrap();
            assert!(n > 0, "adapter closed the stream");
            if let Some(packet) = frames.push(&buf[..n]).unwrap().pop() {
                break packet;
            }
        };
        let frame = Frame::decode(&packet).unwrap();
        far.write_all(&reply(&frame)).await.unwrap();
        frame
    }

    fn settings_reply(frame: &Frame, settings: AdapterSettings) -> Bytes {
        CommandCompleteEvent::new(
            frame.controller_index(),
            frame.code(),
            status::SUCCESS,
            settings.encode(),
        )
        .encode()
    }

    fn mgmt() -> (Mgmt<StreamTransport>, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let adapter = Arc::new(Adapter::new(StreamTransport::from_stream(near)));
        (Mgmt::new(adapter, 0), far)
    }

    #[tokio::test]
    async fn test_set_powered_payload_and_settings() {
        let (mgmt, mut far) = mgmt();

        let sender = {
            let mgmt = mgmt.clone();
            tokio::spawn(async move { mgmt.set_powered(true).await })
        };
        let frame = answer(&mut far, |f| settings_reply(f, AdapterSettings::POWERED)).await;

        sender.await.unwrap().unwrap();
        assert_eq!(frame.code(), command::SET_POWERED);
        assert_eq!(frame.controller_index(), 0);
        assert_eq!(frame.payload(), &[1]);
        assert_eq!(mgmt.adapter().settings(), AdapterSettings::POWERED);
    }

    #[tokio::test]
    async fn test_set_discoverable_payload() {
        let (mgmt, mut far) = mgmt();

        let sender = {
            let mgmt = mgmt.clone();
            tokio::spawn(async move { mgmt.set_discoverable(1, 0x0102).await })
        };
        let frame = answer(&mut far, |f| settings_reply(f, AdapterSettings::DISCOVERABLE)).await;

        sender.await.unwrap().unwrap();
        assert_eq!(frame.code(), command::SET_DISCOVERABLE);
        assert_eq!(frame.payload(), &[0x01, 0x02, 0x01]);
        assert!(mgmt.adapter().settings().contains(AdapterSettings::DISCOVERABLE));
    }

    #[tokio::test]
    async fn test_set_name_truncates() {
        let (mgmt, mut far) = mgmt();
        let long = "x".repeat(300);

        let sender = {
            let mgmt = mgmt.clone();
            tokio::spawn(async move { mgmt.set_name(&long, "shortname-too-long").await })
        };
        let frame = answer(&mut far, |f| {
            CommandCompleteEvent::new(0, f.code(), status::SUCCESS, f.payload.clone()).encode()
        })
        .await;

        sender.await.unwrap().unwrap();
        assert_eq!(frame.payload_len(), NAME_SIZE + SHORT_NAME_SIZE);
        let stored = mgmt.adapter().local_name();
        assert_eq!(stored.name.len(), NAME_SIZE - 1);
        assert_eq!(stored.short_name, "shortname-");
    }

    #[tokio::test]
    async fn test_mode_commands_send_one_byte() {
        let (mgmt, mut far) = mgmt();

        let sender = {
            let mgmt = mgmt.clone();
            tokio::spawn(async move { mgmt.set_secure_connections(2).await })
        };
        let frame = answer(&mut far, |f| {
            settings_reply(f, AdapterSettings::SECURE_CONNECTIONS)
        })
        .await;

        sender.await.unwrap().unwrap();
        assert_eq!(frame.code(), command::SET_SECURE_CONNECTIONS);
        assert_eq!(frame.payload(), &[2]);
    }
}
