//! # cctalk-core
//!
//! Core protocol implementation for ccTalk cash-handling peripherals.
//!
//! This crate provides the low-level protocol primitives:
//! - Message structure and framing for both checksum variants
//! - CRC-16/CCITT and simple checksum calculation
//! - Header definitions
//! - Protocol constants

pub mod builder;
pub mod checksum;
pub mod constants;
pub mod error;
pub mod header;
pub mod message;

pub use builder::MessageBuilder;
pub use error::{Checksum, Error, Result};
pub use header::Header;
pub use message::{ChecksumType, CrcMessage, Message, SimpleMessage};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "4.7";
