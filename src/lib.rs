//! # mgmt-adapter
//!
//! Async engine for the Bluetooth management protocol: the binary
//! command/event protocol used to configure a local controller over its
//! control channel.
//!
//! ## Architecture
//!
//! - **Wire codec** ([`protocol`]): Little Endian records with explicit
//!   length validation, a 6-byte header and named opcodes
//! - **Event dispatcher**: one background task that reads every packet,
//!   updates the adapter state and signals command responses
//! - **Correlation**: waiters registered before each command is written,
//!   released by the response carrying their command code, bounded by a
//!   timeout
//! - **Adapter state**: a lock-guarded snapshot of settings, controller
//!   information, version, name and the connection count
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mgmt_adapter::{Adapter, Mgmt, StreamTransport};
//!
//! #[tokio::main]
//! async fn main() -> mgmt_adapter::Result<()> {
//!     let adapter = Arc::new(Adapter::new(StreamTransport::unix("/run/mgmt.sock")));
//!     adapter.start().await?;
//!
//!     let mgmt = Mgmt::new(adapter.clone(), 0);
//!     mgmt.set_powered(true).await?;
//!     println!("settings: {}", adapter.settings());
//!
//!     adapter.close().await
//! }
//! ```

pub mod config;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;

mod adapter;
mod mgmt;

pub use adapter::{Adapter, AdapterBuilder};
pub use config::{AdapterConfig, StreamConfig};
pub use correlation::Response;
pub use error::{DecodeError, MgmtError, Result};
pub use mgmt::Mgmt;
pub use state::AdapterSnapshot;
pub use transport::{StreamTransport, Transport};
