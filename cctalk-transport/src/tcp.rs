//! TCP transport
//!
//! Reaches a ccTalk bus through a serial-over-IP bridge.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex as SyncMutex;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{
    error::*,
    stream::{drain_ready, read_exact_within},
    Transport,
};

/// TCP transport for a serial-over-IP bridge
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: SyncMutex<Option<SocketAddr>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: SyncMutex::new(None),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let cached = *self.socket_addr.lock();
        if let Some(addr) = cached {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addr = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        *self.socket_addr.lock() = Some(addr);
        Ok(addr)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // ccTalk frames are tiny, send them immediately
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        *self.reader.lock().await = Some(reader);
        *self.writer.lock().await = Some(writer);
        self.connected.store(true, Ordering::SeqCst);

        debug!("Connected to {}", addr);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("Disconnecting from {}...", self.remote_addr());

        if let Some(mut writer) = self.writer.lock().await.take() {
            // Graceful shutdown
            let _ = writer.shutdown().await;
        }
        self.reader.lock().await.take();

        *self.socket_addr.lock() = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {:02X?}", data.len(), data);

        writer.write_all(data).await?;
        writer.flush().await?;

        Ok(())
    }

    async fn read(&self, count: usize, timeout: Duration) -> Result<Bytes> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotConnected)?;

        read_exact_within(reader, count, timeout).await
    }

    async fn discard_input(&self) -> Result<usize> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotConnected)?;

        drain_ready(reader).await
    }

    fn remote_addr(&self) -> String {
        let resolved = *self.socket_addr.lock();
        resolved
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_transport_create() {
        let transport = TcpTransport::new("192.168.1.50", 4001);
        assert!(!transport.is_open());
        assert_eq!(transport.remote_addr(), "192.168.1.50:4001");
    }

    #[tokio::test]
    async fn test_tcp_transport_invalid_address() {
        let transport = TcpTransport::new("invalid..address", 4001)
            .with_connect_timeout(Duration::from_millis(100));

        let result = transport.open().await;
        assert!(result.is_err());
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_tcp_not_connected() {
        let transport = TcpTransport::new("127.0.0.1", 4001);
        assert!(matches!(transport.write(&[0]).await, Err(Error::NotConnected)));
        assert!(matches!(
            transport.read(1, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_tcp_loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let bridge = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 5];
            socket.read_exact(&mut request).await.unwrap();
            socket.write_all(&[1, 0, 0x30, 0, 0x37]).await.unwrap();
            request
        });

        let transport = TcpTransport::new("127.0.0.1", port);
        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.write(&[40, 0, 0xB6, 254, 0x21]).await.unwrap();
        let reply = transport.read(5, Duration::from_secs(1)).await.unwrap();
        assert_eq!(reply.as_ref(), &[1, 0, 0x30, 0, 0x37]);
        assert_eq!(bridge.await.unwrap(), [40, 0, 0xB6, 254, 0x21]);

        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }
}
