//! Transport module - the control channel to the controller.
//!
//! The engine only needs five primitives from the channel, captured by the
//! [`Transport`] trait. [`StreamTransport`] implements them over any
//! tokio byte stream, including Unix domain sockets.

mod stream;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

pub use stream::StreamTransport;

/// Boxed future returned by [`Transport`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A control channel that carries whole packets.
///
/// `read` is called only by the event dispatcher; `write` may be called
/// from any number of tasks at once.
pub trait Transport: Send + Sync + 'static {
    /// Open the channel. Succeeds immediately if already connected.
    fn connect(&self) -> BoxFuture<'_, Result<()>>;

    /// Check if the channel is open.
    fn is_connected(&self) -> bool;

    /// Write one complete packet.
    fn write<'a>(&'a self, packet: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Read the next complete packet.
    ///
    /// Returns `Err(ConnectionClosed)` at end of stream. Must be
    /// cancel safe: dropping the future loses no data.
    fn read(&self) -> BoxFuture<'_, Result<Bytes>>;

    /// Close the channel.
    fn disconnect(&self) -> BoxFuture<'_, Result<()>>;
}
