//! Adapter builder and command sender.
//!
//! The [`AdapterBuilder`] provides a fluent API for configuring the
//! adapter. The [`Adapter`] manages the lifecycle:
//! 1. Connect the transport (on `start` or the first command)
//! 2. Spawn the event dispatcher
//! 3. Send commands and wait for their correlated responses
//! 4. Stop the dispatcher and disconnect on `close`
//!
//! # Example
//!
//! ```ignore
//! use mgmt_adapter::{AdapterBuilder, StreamTransport};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> mgmt_adapter::Result<()> {
//!     let adapter = AdapterBuilder::new()
//!         .command_timeout(Duration::from_millis(500))
//!         .build(StreamTransport::unix("/run/mgmt.sock"));
//!
//!     adapter.start().await?;
//!     adapter.sync(0).await;
//!     println!("{}", adapter.settings());
//!     adapter.close().await
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::config::AdapterConfig;
use crate::correlation::{Response, ResponseSlot};
use crate::dispatcher::{Dispatcher, DispatcherHandle};
use crate::error::{MgmtError, Result};
use crate::protocol::opcodes::{command, is_valid_command};
use crate::protocol::{
    command_name, AdapterSettings, ControllerInformation, Frame, LocalName, VersionInformation,
    WireRecord, NON_CONTROLLER,
};
use crate::state::{AdapterSnapshot, AdapterState};
use crate::transport::Transport;

/// Builder for configuring and creating an [`Adapter`].
#[derive(Debug, Clone, Default)]
pub struct AdapterBuilder {
    config: AdapterConfig,
}

impl AdapterBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how long `send_command` waits for a response.
    ///
    /// Default: 1000 ms
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Build the adapter. Nothing is connected or spawned yet.
    pub fn build<T: Transport>(self, transport: T) -> Adapter<T> {
        Adapter {
            transport: Arc::new(transport),
            state: Arc::new(AdapterState::new()),
            slot: Arc::new(ResponseSlot::new()),
            dispatcher: Mutex::new(None),
            config: self.config,
        }
    }
}

/// Protocol engine for one control channel.
///
/// Share it with `Arc` to send commands from several tasks. Commands with
/// different codes may be in flight at once; two in flight with the same
/// code cannot be told apart, and the first response releases both.
pub struct Adapter<T: Transport> {
    transport: Arc<T>,
    state: Arc<AdapterState>,
    slot: Arc<ResponseSlot>,
    dispatcher: Mutex<Option<DispatcherHandle>>,
    config: AdapterConfig,
}

impl<T: Transport> Adapter<T> {
    /// Create a new adapter builder.
    ///
    /// `T` is not known until [`AdapterBuilder::build`]; name it
    /// (`Adapter::<MyTransport>::builder()`) or use [`AdapterBuilder::new`].
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// Create an adapter with default configuration.
    pub fn new(transport: T) -> Self {
        AdapterBuilder::new().build(transport)
    }

    /// Connect the transport if needed and spawn the event dispatcher.
    ///
    /// Fails with `AlreadyRunning` if the dispatcher is running, or with
    /// the transport's error if it cannot connect.
    pub async fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        if Self::running(&dispatcher) {
            tracing::warn!("Event dispatcher already running");
            return Err(MgmtError::AlreadyRunning);
        }
        self.spawn_dispatcher(&mut dispatcher).await
    }

    /// Stop the event dispatcher and wait for it to end.
    ///
    /// Pending `send_command` calls are not released; they time out.
    pub async fn stop(&self) {
        let handle = self.dispatcher.lock().await.take();
        match handle {
            Some(handle) => handle.stop().await,
            None => tracing::warn!("Event dispatcher not running"),
        }
    }

    /// Stop the dispatcher (if running) and disconnect the transport.
    pub async fn close(&self) -> Result<()> {
        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        self.transport.disconnect().await
    }

    /// Check if the event dispatcher is running.
    pub async fn is_running(&self) -> bool {
        Self::running(&*self.dispatcher.lock().await)
    }

    fn running(dispatcher: &Option<DispatcherHandle>) -> bool {
        dispatcher.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Start unless already running. A dispatcher that ended on its own
    /// (transport closed) is replaced.
    async fn ensure_started(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        if Self::running(&dispatcher) {
            return Ok(());
        }
        self.spawn_dispatcher(&mut dispatcher).await
    }

    async fn spawn_dispatcher(&self, slot: &mut Option<DispatcherHandle>) -> Result<()> {
        if !self.transport.is_connected() {
            if let Err(e) = self.transport.connect().await {
                tracing::error!("Failed to connect control channel: {}", e);
                return Err(e);
            }
        }
        let dispatcher = Dispatcher::new(self.state.clone(), self.slot.clone());
        *slot = Some(dispatcher.spawn(self.transport.clone()));
        Ok(())
    }

    /// Send a command and wait for its response.
    ///
    /// Starts the adapter if needed. Returns once a command complete or
    /// command status event for `code` has been dispatched, whatever its
    /// status; see [`Adapter::last_response`] for the status. Fails with
    /// `Timeout` if none arrives within the configured timeout.
    pub async fn send_command(
        &self,
        code: u16,
        controller_index: u16,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        if !is_valid_command(code) {
            tracing::warn!("Refusing to send invalid command code {:#06x}", code);
            return Err(MgmtError::InvalidCommand(code));
        }
        let frame = Frame::command(code, controller_index, payload.into())?;
        let name = command_name(code).unwrap_or("Unknown Command");

        self.ensure_started().await?;
        self.slot.reset();
        let pending = self.slot.register(code);

        tracing::debug!(
            "Sending {} to controller {:#06x} ({} payload bytes)",
            name,
            controller_index,
            frame.payload_len()
        );
        if let Err(e) = self.transport.write(&frame.encode()).await {
            tracing::error!("Failed to write {}: {}", name, e);
            return Err(e);
        }

        match pending.wait(self.config.command_timeout).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!("No response to {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Read version and controller information into the store.
    ///
    /// Failures are logged, not returned; the store may end up partially
    /// updated.
    pub async fn sync(&self, controller_index: u16) {
        tracing::debug!("Synchronizing version information");
        if let Err(e) = self
            .send_command(command::READ_VERSION_INFORMATION, NON_CONTROLLER, Bytes::new())
            .await
        {
            tracing::error!("Failed to get version information: {}", e);
        }

        tracing::debug!("Synchronizing controller information");
        if let Err(e) = self
            .send_command(command::READ_CONTROLLER_INFORMATION, controller_index, Bytes::new())
            .await
        {
            tracing::error!("Failed to get controller information: {}", e);
        }
    }

    /// Current adapter settings.
    pub fn settings(&self) -> AdapterSettings {
        self.state.settings()
    }

    pub fn controller_information(&self) -> ControllerInformation {
        self.state.controller_information()
    }

    pub fn version_information(&self) -> VersionInformation {
        self.state.version_information()
    }

    pub fn local_name(&self) -> LocalName {
        self.state.local_name()
    }

    /// Number of connected remote devices.
    pub fn active_connections(&self) -> u32 {
        self.state.active_connections()
    }

    /// Consistent copy of all stored state.
    pub fn snapshot(&self) -> AdapterSnapshot {
        self.state.snapshot()
    }

    /// Code and status of the most recent response since the last command
    /// was sent.
    pub fn last_response(&self) -> Option<Response> {
        self.slot.last()
    }

    /// Shared state store, for collaborators that outlive a borrow.
    pub fn state(&self) -> &Arc<AdapterState> {
        &self.state
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}
