//! Protocol constants

/// Address of the host (master) on a ccTalk bus
pub const MASTER_ADDRESS: u8 = 1;

/// Broadcast address
pub const BROADCAST_ADDRESS: u8 = 0;

/// Default address of a bill validator
pub const DEFAULT_BILL_VALIDATOR_ADDRESS: u8 = 40;

/// Default address of a coin acceptor
pub const DEFAULT_COIN_ACCEPTOR_ADDRESS: u8 = 2;

/// Default read timeout (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default buffered event poll period (milliseconds)
pub const DEFAULT_POLL_PERIOD_MS: u64 = 200;

/// Maximum attempts for a liveness (simple poll) check
pub const MAX_LIVENESS_ATTEMPTS: usize = 3;

