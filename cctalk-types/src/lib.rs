//! Type definitions for cctalk

pub mod device_info;
pub mod error;
pub mod event;

pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use event::{EventCategory, EventKind, EventRecord, EventSnapshot};
