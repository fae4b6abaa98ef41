//! Adapter state store.
//!
//! One snapshot of everything the controller has reported, behind a single
//! lock. Only the event dispatcher writes; every reader gets a copy.

use parking_lot::Mutex;

use crate::protocol::{AdapterSettings, ControllerInformation, LocalName, VersionInformation};

/// Everything known about the controller at one point in time.
///
/// All fields start zero-valued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterSnapshot {
    /// Settings from the most recent settings response or notification.
    pub settings: AdapterSettings,
    pub controller_information: ControllerInformation,
    pub version_information: VersionInformation,
    pub local_name: LocalName,
    /// Number of currently connected remote devices.
    pub active_connections: u32,
}

/// Lock-guarded [`AdapterSnapshot`].
#[derive(Debug, Default)]
pub struct AdapterState {
    inner: Mutex<AdapterSnapshot>,
}

impl AdapterState {
    /// Create a store with a zero-valued snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole snapshot, taken under one lock.
    pub fn snapshot(&self) -> AdapterSnapshot {
        self.inner.lock().clone()
    }

    pub fn settings(&self) -> AdapterSettings {
        self.inner.lock().settings
    }

    pub fn controller_information(&self) -> ControllerInformation {
        self.inner.lock().controller_information.clone()
    }

    pub fn version_information(&self) -> VersionInformation {
        self.inner.lock().version_information
    }

    pub fn local_name(&self) -> LocalName {
        self.inner.lock().local_name.clone()
    }

    pub fn active_connections(&self) -> u32 {
        self.inner.lock().active_connections
    }

    pub(crate) fn set_settings(&self, settings: AdapterSettings) {
        self.inner.lock().settings = settings;
    }

    pub(crate) fn set_controller_information(&self, info: ControllerInformation) {
        self.inner.lock().controller_information = info;
    }

    pub(crate) fn set_version_information(&self, version: VersionInformation) {
        self.inner.lock().version_information = version;
    }

    pub(crate) fn set_local_name(&self, name: LocalName) {
        self.inner.lock().local_name = name;
    }

    /// Count a new connection. Returns the updated count.
    pub(crate) fn connection_opened(&self) -> u32 {
        let mut state = self.inner.lock();
        state.active_connections = state.active_connections.saturating_add(1);
        state.active_connections
    }

    /// Count a disconnection. Returns the updated count, or `None` if the
    /// count was already zero (it stays at zero).
    pub(crate) fn connection_closed(&self) -> Option<u32> {
        let mut state = self.inner.lock();
        if state.active_connections == 0 {
            return None;
        }
        state.active_connections -= 1;
        Some(state.active_connections)
    }
}
