//! # cctalk
//!
//! Host-side (master) implementation of the ccTalk serial protocol used by
//! coin acceptors and bill validators.
//!
//! ## Features
//!
//! - CRC-16 and simple checksum framing
//! - Serialized request/response transactions with timeouts
//! - Async/await API using Tokio
//! - Lossless, ordered replay of bill validator events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cctalk::{Device, DeviceConfig, EventPoller, EventReconciler};
//!
//! #[tokio::main]
//! async fn main() -> cctalk::Result<()> {
//!     // Bill validator behind a serial-over-IP bridge
//!     let device = Arc::new(Device::tcp("192.168.1.50", 4001, DeviceConfig::new(40)));
//!
//!     let info = device.initialise().await?;
//!     println!("{}", info);
//!
//!     device.modify_master_inhibit_status(true).await?;
//!
//!     let reconciler = EventReconciler::from_config(device.config());
//!     let poller = EventPoller::for_device(device.clone(), reconciler);
//!     tokio::time::sleep(Duration::from_secs(30)).await;
//!     poller.stop(Duration::from_secs(2)).await?;
//!
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod poller;
pub mod reconciler;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::DeviceConfig;
pub use device::Device;
pub use error::{Error, Result};
pub use poller::EventPoller;
pub use reconciler::{EventListener, EventLoss, EventReconciler, FeedOutcome};

// Re-export types
pub use cctalk_core::{constants, ChecksumType, Header, Message, MessageBuilder};
pub use cctalk_transport::{TcpTransport, TransactionError, Transport};
pub use cctalk_types::{DeviceInfo, EventCategory, EventKind, EventRecord, EventSnapshot};
