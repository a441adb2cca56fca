//! Generic stream transport
//!
//! Wraps any pair of async read/write halves, e.g. a serial port stream or an
//! in-memory `tokio::io::duplex` pipe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use crate::{error::*, Transport};

/// Same as tokio's own cap for timers that would overflow
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant `timeout` from now, capped for timeouts too large to represent
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Read exactly `count` bytes before `timeout` elapses
///
/// On timeout the error reports how many bytes did arrive, so callers can
/// tell silence from a response cut short.
pub(crate) async fn read_exact_within<R>(
    reader: &mut R,
    count: usize,
    timeout: Duration,
) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let deadline = deadline_after(timeout);
    let mut buf = BytesMut::with_capacity(count);

    while buf.len() < count {
        let mut limited = (&mut *reader).take((count - buf.len()) as u64);
        match timeout_at(deadline, limited.read_buf(&mut buf)).await {
            Err(_) => {
                return Err(Error::ReadTimeout {
                    expected: count,
                    received: buf.len(),
                });
            }
            Ok(Ok(0)) => return Err(Error::ConnectionClosed),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(Error::Io(e)),
        }
    }

    trace!("Received {} bytes: {:02X?}", buf.len(), &buf[..]);

    Ok(buf.freeze())
}

/// Read and drop whatever `reader` has ready without waiting
pub(crate) async fn drain_ready<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 64];
    let mut discarded = 0;

    // A zero timeout still polls the read once
    while let Ok(read) = tokio::time::timeout(Duration::ZERO, reader.read(&mut buf)).await {
        match read? {
            0 => break,
            n => discarded += n,
        }
    }

    if discarded > 0 {
        trace!("Discarded {} stale bytes", discarded);
    }
    Ok(discarded)
}

/// Transport over an arbitrary async byte stream
///
/// The channel starts closed; [`open`](Transport::open) only marks it usable
/// since the underlying stream is already established.
pub struct StreamTransport<R, W> {
    name: String,
    reader: Mutex<R>,
    writer: Mutex<W>,
    open: AtomicBool,
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            open: AtomicBool::new(false),
        }
    }
}

impl<S> StreamTransport<ReadHalf<S>, WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite + Send,
{
    /// Split a bidirectional stream into a transport
    pub fn from_stream(stream: S, name: impl Into<String>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            name: name.into(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            open: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn open(&self) -> Result<()> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyConnected);
        }
        debug!("Opened stream {}", self.name);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("Closed stream {}", self.name);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        trace!("Sending {} bytes: {:02X?}", data.len(), data);

        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read(&self, count: usize, timeout: Duration) -> Result<Bytes> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        let mut reader = self.reader.lock().await;
        read_exact_within(&mut *reader, count, timeout).await
    }

    async fn discard_input(&self) -> Result<usize> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        let mut reader = self.reader.lock().await;
        drain_ready(&mut *reader).await
    }

    fn remote_addr(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::DuplexStream;

    type Pipe = StreamTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    async fn open_pipe() -> (Pipe, DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(ours, "pipe");
        transport.open().await.unwrap();
        (transport, theirs)
    }

    #[tokio::test]
    async fn test_closed_stream_rejects_io() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(ours, "pipe");

        assert!(!transport.is_open());
        assert!(matches!(transport.write(&[1]).await, Err(Error::NotConnected)));
        assert!(matches!(
            transport.read(1, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_open_twice() {
        let (transport, _theirs) = open_pipe().await;
        assert!(matches!(transport.open().await, Err(Error::AlreadyConnected)));

        transport.close().await.unwrap();
        assert!(!transport.is_open());
        transport.open().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_exact_count() {
        let (transport, mut theirs) = open_pipe().await;
        theirs.write_all(&[1, 2, 3, 4, 5]).await.unwrap();

        let head = transport.read(2, Duration::from_millis(100)).await.unwrap();
        let tail = transport.read(3, Duration::from_millis(100)).await.unwrap();

        assert_eq!(head.as_ref(), &[1, 2]);
        assert_eq!(tail.as_ref(), &[3, 4, 5]);
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (transport, mut theirs) = open_pipe().await;
        transport.write(&[40, 0, 0xB6, 254, 0x21]).await.unwrap();

        let mut buf = [0u8; 5];
        theirs.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [40, 0, 0xB6, 254, 0x21]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_reports_partial() {
        let (transport, mut theirs) = open_pipe().await;
        theirs.write_all(&[1, 2]).await.unwrap();

        let result = transport.read(4, Duration::from_millis(50)).await;
        assert!(matches!(
            result,
            Err(Error::ReadTimeout {
                expected: 4,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_read_with_unbounded_timeout() {
        let (transport, mut theirs) = open_pipe().await;
        theirs.write_all(&[1, 2, 3]).await.unwrap();

        let data = transport.read(3, Duration::MAX).await.unwrap();
        assert_eq!(data.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_discard_input() {
        let (transport, mut theirs) = open_pipe().await;
        assert_eq!(transport.discard_input().await.unwrap(), 0);

        theirs.write_all(&[9, 9, 9]).await.unwrap();
        assert_eq!(transport.discard_input().await.unwrap(), 3);

        theirs.write_all(&[7]).await.unwrap();
        let data = transport.read(1, Duration::from_millis(100)).await.unwrap();
        assert_eq!(data.as_ref(), &[7]);
    }

    #[tokio::test]
    async fn test_peer_hangup() {
        let (transport, theirs) = open_pipe().await;
        drop(theirs);

        let result = transport.read(1, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
