//! Event dispatcher.
//!
//! The only reader of the transport and the only writer of adapter state.
//! Each packet is decoded, applied to the [`AdapterState`], and, for
//! command responses, signalled to the [`ResponseSlot`]:
//!
//! ```text
//!   transport.read() ──▶ peek code ──▶ decode event ──▶ update state
//!                                                   └──▶ signal(code)
//! ```
//!
//! Decode failures drop the packet and the loop continues; only a failed
//! read or cancellation ends it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::correlation::ResponseSlot;
use crate::error::DecodeError;
use crate::protocol::opcodes::{command, event, is_valid_event, status};
use crate::protocol::{
    command_name, decode_exact, event_name, status_name, AdapterSettings,
    ClassOfDeviceChangedEvent, CommandCompleteEvent, CommandStatusEvent, ControllerInformation,
    DeviceConnectedEvent, DeviceDisconnectedEvent, Header, LocalName, LocalNameChangedEvent,
    NewSettingsEvent, VersionInformation, WireRecord,
};
use crate::state::AdapterState;
use crate::transport::Transport;

/// Commands whose successful completion carries the new settings.
const SETTINGS_COMMANDS: [u16; 14] = [
    command::SET_POWERED,
    command::SET_DISCOVERABLE,
    command::SET_CONNECTABLE,
    command::SET_FAST_CONNECTABLE,
    command::SET_BONDABLE,
    command::SET_LINK_SECURITY,
    command::SET_SECURE_SIMPLE_PAIRING,
    command::SET_HIGH_SPEED,
    command::SET_LOW_ENERGY,
    command::SET_ADVERTISING,
    command::SET_BREDR,
    command::SET_SECURE_CONNECTIONS,
    command::SET_DEBUG_KEYS,
    command::SET_PRIVACY,
];

fn command_label(code: u16) -> &'static str {
    command_name(code).unwrap_or("Unknown Command")
}

/// Applies incoming events to shared state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: Arc<AdapterState>,
    slot: Arc<ResponseSlot>,
}

impl Dispatcher {
    pub fn new(state: Arc<AdapterState>, slot: Arc<ResponseSlot>) -> Self {
        Self { state, slot }
    }

    /// Handle one packet as read from the transport.
    ///
    /// Never fails: malformed or unsupported packets are logged and dropped.
    pub fn dispatch(&self, packet: &[u8]) {
        let Some(code) = Header::peek_code(packet) else {
            tracing::warn!("Dropping packet of {} bytes: too short", packet.len());
            return;
        };
        if !is_valid_event(code) {
            tracing::warn!("Dropping packet with invalid event code {:#06x}", code);
            return;
        }

        let result = match code {
            event::COMMAND_COMPLETE => self.command_complete(packet),
            event::COMMAND_STATUS => self.command_status(packet),
            event::DEVICE_CONNECTED => self.device_connected(packet),
            event::DEVICE_DISCONNECTED => self.device_disconnected(packet),
            event::CLASS_OF_DEVICE_CHANGED => self.class_of_device_changed(packet),
            event::NEW_SETTINGS => self.new_settings(packet),
            event::LOCAL_NAME_CHANGED => self.local_name_changed(packet),
            _ => {
                tracing::warn!(
                    "Unsupported event {:#06x} ({})",
                    code,
                    event_name(code).unwrap_or("Unknown Event")
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(
                "Dropping {}: {}",
                event_name(code).unwrap_or("Unknown Event"),
                e
            );
        }
    }

    fn command_complete(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = CommandCompleteEvent::decode(packet)?;
        let name = command_label(event.command_code);

        if event.status == status::SUCCESS {
            // State is written before the signal so a released sender sees it.
            self.store_response(&event)?;
        } else {
            tracing::warn!(
                "{} failed with status {:#04x} ({})",
                name,
                event.status,
                status_name(event.status).unwrap_or("Unknown")
            );
        }

        tracing::debug!("Command complete: {}", name);
        self.slot.signal(event.command_code, event.status);
        Ok(())
    }

    /// Decode the return parameters of a successful command into the store.
    fn store_response(&self, event: &CommandCompleteEvent) -> Result<(), DecodeError> {
        let payload = &event.payload[..];
        match event.command_code {
            command::READ_VERSION_INFORMATION => {
                let version: VersionInformation = decode_exact(payload)?;
                tracing::debug!(
                    "Version information: version {}, revision {}",
                    version.version,
                    version.revision
                );
                self.state.set_version_information(version);
            }
            command::READ_CONTROLLER_INFORMATION => {
                let info: ControllerInformation = decode_exact(payload)?;
                tracing::debug!(
                    "Controller information: address {}, version {}, manufacturer {:#06x}, \
                     supported [{}], current [{}], name {:?}, short name {:?}",
                    info.address,
                    info.version,
                    info.manufacturer,
                    info.supported_settings,
                    info.current_settings,
                    info.name,
                    info.short_name
                );
                tracing::debug!("Class of device: {}", info.class_of_device);
                self.state.set_controller_information(info);
            }
            command::SET_LOCAL_NAME => {
                let name: LocalName = decode_exact(payload)?;
                tracing::info!("Local name: {:?} ({:?})", name.name, name.short_name);
                self.state.set_local_name(name);
            }
            code if SETTINGS_COMMANDS.contains(&code) => {
                let settings: AdapterSettings = decode_exact(payload)?;
                tracing::debug!("Adapter settings: [{}]", settings);
                self.state.set_settings(settings);
            }
            _ => {}
        }
        Ok(())
    }

    fn command_status(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = CommandStatusEvent::decode(packet)?;
        let name = command_label(event.command_code);
        if event.status == status::SUCCESS {
            tracing::debug!("Command status: {} pending", name);
        } else {
            tracing::warn!(
                "{} failed with status {:#04x} ({})",
                name,
                event.status,
                status_name(event.status).unwrap_or("Unknown")
            );
        }
        self.slot.signal(event.command_code, event.status);
        Ok(())
    }

    fn device_connected(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = DeviceConnectedEvent::decode(packet)?;
        let count = self.state.connection_opened();
        tracing::debug!(
            "Device {} connected, connection count incremented to {}",
            event.address,
            count
        );
        Ok(())
    }

    fn device_disconnected(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = DeviceDisconnectedEvent::decode(packet)?;
        match self.state.connection_closed() {
            Some(count) => tracing::debug!(
                "Device {} disconnected (reason {:#04x}), connection count decremented to {}",
                event.address,
                event.reason,
                count
            ),
            None => tracing::debug!(
                "Device {} disconnected while connection count is zero; ignoring",
                event.address
            ),
        }
        Ok(())
    }

    fn class_of_device_changed(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = ClassOfDeviceChangedEvent::decode(packet)?;
        tracing::info!("Class of device changed: {}", event.class_of_device);
        Ok(())
    }

    fn new_settings(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = NewSettingsEvent::decode(packet)?;
        tracing::debug!("New settings: [{}]", event.settings);
        self.state.set_settings(event.settings);
        Ok(())
    }

    fn local_name_changed(&self, packet: &[u8]) -> Result<(), DecodeError> {
        let event = LocalNameChangedEvent::decode(packet)?;
        tracing::info!("Local name changed: {:?}", event.local_name.name);
        self.state.set_local_name(event.local_name);
        Ok(())
    }

    /// Read and dispatch packets until `cancel` fires or a read fails.
    pub async fn run<T: Transport + ?Sized>(&self, transport: &T, cancel: &CancellationToken) {
        tracing::debug!("Event dispatcher started");
        loop {
            let packet = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Event dispatcher cancelled");
                    break;
                }
                read = transport.read() => match read {
                    Ok(packet) => packet,
                    Err(e) => {
                        tracing::error!("Event dispatcher read failed: {}", e);
                        break;
                    }
                },
            };
            self.dispatch(&packet);
        }
        tracing::debug!("Event dispatcher stopped");
    }

    /// Run on a new task.
    pub fn spawn<T: Transport>(self, transport: Arc<T>) -> DispatcherHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(transport.as_ref(), &token).await;
        });
        DispatcherHandle { cancel, task }
    }
}

/// Handle to a spawned dispatcher task.
#[derive(Debug)]
pub struct DispatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Check if the task has ended (stopped or transport closed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the task and wait for it to end.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::error!("Event dispatcher task failed: {}", e);
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::Response;
    use crate::protocol::{Address, ClassOfDevice, WireRecord};
    use crate::transport::StreamTransport;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn dispatcher() -> (Dispatcher, Arc<AdapterState>, Arc<ResponseSlot>) {
        let state = Arc::new(AdapterState::new());
        let slot = Arc::new(ResponseSlot::new());
        (Dispatcher::new(state.clone(), slot.clone()), state, slot)
    }

    fn complete(code: u16, status: u8, payload: Bytes) -> Bytes {
        CommandCompleteEvent::new(0, code, status, payload).encode()
    }

    #[test]
    fn test_version_complete_updates_store_and_signals() {
        let (dispatcher, state, slot) = dispatcher();
        let version = VersionInformation {
            version: 1,
            revision: 22,
        };

        dispatcher.dispatch(&complete(
            command::READ_VERSION_INFORMATION,
            status::SUCCESS,
            version.encode(),
        ));

        assert_eq!(state.version_information(), version);
        assert_eq!(slot.last(), Some(Response { code: 1, status: 0 }));
    }

    #[test]
    fn test_payload_size_mismatch_is_dropped() {
        let (dispatcher, state, slot) = dispatcher();

        // Version information is 3 bytes; send 4
        dispatcher.dispatch(&complete(
            command::READ_VERSION_INFORMATION,
            status::SUCCESS,
            Bytes::from_static(&[1, 2, 3, 4]),
        ));

        assert_eq!(state.version_information(), VersionInformation::default());
        assert_eq!(slot.last(), None);
    }

    #[test]
    fn test_controller_information_stored() {
        let (dispatcher, state, _slot) = dispatcher();
        let info = ControllerInformation {
            address: Address([1, 2, 3, 4, 5, 6]),
            name: "hub".to_string(),
            current_settings: AdapterSettings::POWERED,
            class_of_device: ClassOfDevice::from_bits(0x0104),
            ..ControllerInformation::default()
        };

        dispatcher.dispatch(&complete(
            command::READ_CONTROLLER_INFORMATION,
            status::SUCCESS,
            info.encode(),
        ));

        assert_eq!(state.controller_information(), info);
    }

    #[test]
    fn test_settings_command_complete() {
        let (dispatcher, state, slot) = dispatcher();
        let settings = AdapterSettings::POWERED | AdapterSettings::LOW_ENERGY;

        dispatcher.dispatch(&complete(command::SET_POWERED, status::SUCCESS, settings.encode()));

        assert_eq!(state.settings(), settings);
        assert_eq!(slot.last().map(|r| r.code), Some(command::SET_POWERED));
    }

    #[test]
    fn test_local_name_command_complete() {
        let (dispatcher, state, _slot) = dispatcher();
        let name = LocalName::new("kitchen", "kit");

        dispatcher.dispatch(&complete(command::SET_LOCAL_NAME, status::SUCCESS, name.encode()));

        assert_eq!(state.local_name(), name);
    }

    #[test]
    fn test_failed_command_signals_without_store() {
        let (dispatcher, state, slot) = dispatcher();

        dispatcher.dispatch(&complete(command::SET_POWERED, status::BUSY, Bytes::new()));

        assert!(state.settings().is_empty());
        assert_eq!(
            slot.last(),
            Some(Response {
                code: command::SET_POWERED,
                status: status::BUSY
            })
        );
    }

    #[test]
    fn test_unstored_command_still_signals() {
        let (dispatcher, _state, slot) = dispatcher();

        dispatcher.dispatch(&complete(command::SET_APPEARANCE, status::SUCCESS, Bytes::new()));

        assert_eq!(slot.last().map(|r| r.code), Some(command::SET_APPEARANCE));
    }

    #[test]
    fn test_command_status_signals() {
        let (dispatcher, state, slot) = dispatcher();

        dispatcher.dispatch(
            &CommandStatusEvent::new(0, command::SET_LOCAL_NAME, status::NOT_POWERED).encode(),
        );

        assert_eq!(slot.last().map(|r| r.status), Some(status::NOT_POWERED));
        assert_eq!(state.snapshot(), Default::default());
    }

    #[test]
    fn test_connection_counting() {
        let (dispatcher, state, _slot) = dispatcher();
        let connected =
            DeviceConnectedEvent::new(0, Address::default(), 1, 0, Bytes::new()).encode();
        let disconnected = DeviceDisconnectedEvent::new(0, Address::default(), 1, 0x13).encode();

        dispatcher.dispatch(&connected);
        dispatcher.dispatch(&connected);
        dispatcher.dispatch(&disconnected);
        assert_eq!(state.active_connections(), 1);

        dispatcher.dispatch(&disconnected);
        dispatcher.dispatch(&disconnected);
        assert_eq!(state.active_connections(), 0);
    }

    #[test]
    fn test_notifications_update_store() {
        let (dispatcher, state, slot) = dispatcher();

        dispatcher.dispatch(&NewSettingsEvent::new(0, AdapterSettings::BONDABLE).encode());
        dispatcher.dispatch(&LocalNameChangedEvent::new(0, LocalName::new("den", "d")).encode());
        dispatcher.dispatch(
            &ClassOfDeviceChangedEvent::new(0, ClassOfDevice::from_bits(0x20_0404)).encode(),
        );

        assert_eq!(state.settings(), AdapterSettings::BONDABLE);
        assert_eq!(state.local_name().name, "den");
        assert_eq!(slot.last(), None);
    }

    #[test]
    fn test_malformed_packets_ignored() {
        let (dispatcher, state, slot) = dispatcher();

        dispatcher.dispatch(&[]);
        dispatcher.dispatch(&[0x01]);
        // Event code out of range
        dispatcher.dispatch(&Header::new(0x0026, 0, 0).encode());
        dispatcher.dispatch(&Header::new(0x0000, 0, 0).encode());
        // In range but not handled
        dispatcher.dispatch(&Header::new(0x0012, 0, 0).encode());
        // Header length disagrees with packet
        dispatcher.dispatch(&[0x0B, 0x00, 0x00, 0x00, 0x20, 0x00]);

        assert_eq!(state.snapshot(), Default::default());
        assert_eq!(slot.last(), None);
    }

    #[tokio::test]
    async fn test_stop_without_traffic() {
        let (dispatcher, _state, _slot) = dispatcher();
        let (near, _far) = tokio::io::duplex(64);
        let handle = dispatcher.spawn(Arc::new(StreamTransport::from_stream(near)));

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("dispatcher did not stop");
    }

    #[tokio::test]
    async fn test_ends_on_end_of_stream() {
        let (dispatcher, state, _slot) = dispatcher();
        let (near, mut far) = tokio::io::duplex(1024);
        let handle = dispatcher.spawn(Arc::new(StreamTransport::from_stream(near)));

        let connected =
            DeviceConnectedEvent::new(0, Address::default(), 1, 0, Bytes::new()).encode();
        far.write_all(&connected).await.unwrap();
        drop(far);

        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
        assert_eq!(state.active_connections(), 1);
    }
}
