//! Transport layer for ccTalk buses
//!
//! Provides the byte channel abstraction, a TCP (serial-over-IP) channel,
//! a generic stream channel, and the request/response transaction executor.

pub mod error;
pub mod executor;
pub mod stream;
pub mod tcp;

pub use error::{Error, Result, TransactionError};
pub use executor::TransactionExecutor;
pub use stream::StreamTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Byte channel to a ccTalk bus
///
/// All methods take `&self` so that the executor's reader task and the
/// writing caller can share one channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn open(&self) -> Result<()>;

    /// Close the channel
    async fn close(&self) -> Result<()>;

    /// Check if the channel is open
    fn is_open(&self) -> bool;

    /// Write all bytes
    async fn write(&self, data: &[u8]) -> Result<()>;

    /// Read exactly `count` bytes
    ///
    /// Fails with [`Error::ReadTimeout`] if fewer than `count` bytes arrive
    /// within `timeout`.
    async fn read(&self, count: usize, timeout: Duration) -> Result<Bytes>;

    /// Drop bytes already received and not yet read, returning their count
    ///
    /// Never waits for more input.
    async fn discard_input(&self) -> Result<usize>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
