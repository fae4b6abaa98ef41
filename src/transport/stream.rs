//! Byte-stream transport.
//!
//! Packet boundaries are restored with a [`FrameBuffer`], so the stream
//! may split or merge packets freely. Reader and writer halves sit behind
//! separate locks: the dispatcher can block in `read` while any number of
//! tasks write commands.
//!
//! A packet whose header declares more than `max_payload_size` bytes is
//! logged and skipped; reading continues with the next packet.
//!
//! # Example
//!
//! ```ignore
//! use mgmt_adapter::transport::{StreamTransport, Transport};
//!
//! let transport = StreamTransport::unix("/run/mgmt.sock");
//! transport.connect().await?;
//! let packet = transport.read().await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{BoxFuture, Transport};
use crate::config::StreamConfig;
use crate::error::{MgmtError, Result};
use crate::protocol::FrameBuffer;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Reader half plus the framing state that belongs to it.
struct ReadState {
    reader: Option<BoxedReader>,
    frames: FrameBuffer,
    buf: Vec<u8>,
}

impl ReadState {
    fn new(reader: Option<BoxedReader>, config: &StreamConfig) -> Self {
        Self {
            reader,
            frames: FrameBuffer::with_max_payload(config.max_payload_size),
            buf: vec![0u8; config.read_buffer_size.max(1)],
        }
    }

    fn reset(&mut self, reader: Option<BoxedReader>) {
        self.reader = reader;
        self.frames.clear();
    }
}

#[cfg(unix)]
async fn open_endpoint(path: &Path) -> Result<(BoxedReader, BoxedWriter)> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    let (reader, writer) = stream.into_split();
    let reader: BoxedReader = Box::new(reader);
    let writer: BoxedWriter = Box::new(writer);
    Ok((reader, writer))
}

#[cfg(not(unix))]
async fn open_endpoint(_path: &Path) -> Result<(BoxedReader, BoxedWriter)> {
    Err(MgmtError::NotConnected)
}

/// Transport over a tokio byte stream.
pub struct StreamTransport {
    /// Socket path to (re)connect to; `None` for a wrapped stream.
    endpoint: Option<PathBuf>,
    read_state: Mutex<ReadState>,
    writer: Mutex<Option<BoxedWriter>>,
    connected: AtomicBool,
    config: StreamConfig,
}

impl StreamTransport {
    /// Transport for a Unix domain socket. Nothing is opened until
    /// [`Transport::connect`].
    #[cfg(unix)]
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        let config = StreamConfig::default();
        Self {
            endpoint: Some(path.into()),
            read_state: Mutex::new(ReadState::new(None, &config)),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            config,
        }
    }

    /// Wrap an already connected stream.
    ///
    /// Such a transport cannot reconnect once disconnected.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = StreamConfig::default();
        let (reader, writer) = tokio::io::split(stream);
        let reader: BoxedReader = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        Self {
            endpoint: None,
            read_state: Mutex::new(ReadState::new(Some(reader), &config)),
            writer: Mutex::new(Some(writer)),
            connected: AtomicBool::new(true),
            config,
        }
    }

    /// Replace the stream configuration.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        let state = self.read_state.get_mut();
        let reader = state.reader.take();
        *state = ReadState::new(reader, &config);
        self.config = config;
        self
    }

    /// Socket path, if this transport can connect on its own.
    pub fn endpoint(&self) -> Option<&Path> {
        self.endpoint.as_deref()
    }

    /// Current stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    async fn connect_inner(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        let path = self.endpoint.as_deref().ok_or(MgmtError::NotConnected)?;
        let (reader, writer) = open_endpoint(path).await?;

        self.read_state.lock().await.reset(Some(reader));
        *self.writer.lock().await = Some(writer);
        self.connected.store(true, Ordering::Release);

        tracing::debug!("Connected to {}", path.display());
        Ok(())
    }

    async fn write_inner(&self, packet: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(MgmtError::NotConnected)?;
        writer.write_all(packet).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_inner(&self) -> Result<Bytes> {
        let mut guard = self.read_state.lock().await;
        let state = &mut *guard;

        loop {
            match state.frames.next_packet() {
                Ok(Some(packet)) => return Ok(packet),
                Ok(None) => {}
                Err(e) => {
                    // The framer skips the packet by its declared length
                    tracing::warn!("Discarding packet: {}", e);
                    continue;
                }
            }

            let reader = state.reader.as_mut().ok_or(MgmtError::NotConnected)?;
            let n = match reader.read(&mut state.buf).await {
                Ok(0) => {
                    self.connected.store(false, Ordering::Release);
                    return Err(MgmtError::ConnectionClosed);
                }
                Ok(n) => n,
                Err(e) => {
                    self.connected.store(false, Ordering::Release);
                    return Err(MgmtError::Io(e));
                }
            };
            state.frames.extend(&state.buf[..n]);
        }
    }

    /// Waits for an in-progress `read` to finish; stop the reader first.
    async fn disconnect_inner(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("Shutdown of write half failed: {}", e);
            }
        }
        self.read_state.lock().await.reset(None);
        Ok(())
    }
}

impl Transport for StreamTransport {
    fn connect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.connect_inner())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn write<'a>(&'a self, packet: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write_inner(packet))
    }

    fn read(&self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.read_inner())
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.disconnect_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Header, WireRecord};

    fn packet(code: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Header::new(code, 0, payload.len() as u16).encode().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn test_read_fragmented_packet() {
        let (near, mut far) = tokio::io::duplex(1024);
        let transport = StreamTransport::from_stream(near);
        let bytes = packet(1, &[0, 0, 0, 1, 2, 0]);

        far.write_all(&bytes[..4]).await.unwrap();
        let reader = tokio::spawn(async move { transport.read().await.map(|p| p.to_vec()) });
        tokio::task::yield_now().await;
        far.write_all(&bytes[4..]).await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_read_merged_packets() {
        let (near, mut far) = tokio::io::duplex(1024);
        let transport = StreamTransport::from_stream(near);

        let mut bytes = packet(0x0B, b"first");
        bytes.extend_from_slice(&packet(0x0C, b"second"));
        far.write_all(&bytes).await.unwrap();

        let first = transport.read().await.unwrap();
        let second = transport.read().await.unwrap();
        assert_eq!(Header::peek_code(&first), Some(0x0B));
        assert_eq!(Header::peek_code(&second), Some(0x0C));
    }

    #[tokio::test]
    async fn test_end_of_stream() {
        let (near, far) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(near);
        assert!(transport.is_connected());

        drop(far);

        assert!(matches!(
            transport.read().await,
            Err(MgmtError::ConnectionClosed)
        ));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (near, mut far) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(near);
        let bytes = packet(5, &[1]);

        transport.write(&bytes).await.unwrap();

        let mut received = vec![0u8; bytes.len()];
        far.read_exact(&mut received).await.unwrap();
        assert_eq!(received, bytes);
    }

    #[tokio::test]
    async fn test_disconnect_without_endpoint() {
        let (near, _far) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(near);

        transport.disconnect().await.unwrap();

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(&packet(1, &[])).await,
            Err(MgmtError::NotConnected)
        ));
        assert!(matches!(
            transport.connect().await,
            Err(MgmtError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_oversized_payload_skipped() {
        let (near, mut far) = tokio::io::duplex(256);
        let config = StreamConfig {
            max_payload_size: 8,
            ..StreamConfig::default()
        };
        let transport = StreamTransport::from_stream(near).with_config(config);

        far.write_all(&packet(0x0B, &[0xEE; 100])).await.unwrap();
        far.write_all(&packet(0x0C, b"next")).await.unwrap();

        let next = transport.read().await.unwrap();
        assert_eq!(Header::peek_code(&next), Some(0x0C));
        assert!(transport.is_connected());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StreamTransport::unix(dir.path().join("absent.sock"));

        assert!(matches!(transport.connect().await, Err(MgmtError::Io(_))));
        assert!(!transport.is_connected());
    }
}
