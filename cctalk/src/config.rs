//! Device configuration

use std::time::Duration;

use cctalk_core::{
    constants::{
        DEFAULT_POLL_PERIOD_MS, DEFAULT_READ_TIMEOUT_MS, MASTER_ADDRESS, MAX_LIVENESS_ATTEMPTS,
    },
    ChecksumType,
};

/// Default number of snapshots kept by the event reconciler
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Settings for one peripheral on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Bus address of the peripheral
    pub address: u8,

    /// Address of this host, used as source by the simple checksum variant
    pub master_address: u8,

    pub checksum_type: ChecksumType,

    /// Time allowed for a complete response frame
    pub read_timeout: Duration,

    /// Delay between two event buffer reads while polling
    pub poll_period: Duration,

    /// Event snapshots kept for inspection
    pub history_capacity: usize,

    /// Simple polls attempted by a liveness check
    pub liveness_attempts: usize,
}

impl DeviceConfig {
    /// Configuration for the device at `address`, with protocol defaults
    pub fn new(address: u8) -> Self {
        Self {
            address,
            master_address: MASTER_ADDRESS,
            checksum_type: ChecksumType::Crc16,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            poll_period: Duration::from_millis(DEFAULT_POLL_PERIOD_MS),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            liveness_attempts: MAX_LIVENESS_ATTEMPTS,
        }
    }

    pub fn with_master_address(mut self, master_address: u8) -> Self {
        self.master_address = master_address;
        self
    }

    pub fn with_checksum_type(mut self, checksum_type: ChecksumType) -> Self {
        self.checksum_type = checksum_type;
        self
    }

    /// Set response timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Set reconciler history capacity (at least 1)
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Set liveness attempts (at least 1)
    pub fn with_liveness_attempts(mut self, attempts: usize) -> Self {
        self.liveness_attempts = attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::new(40);

        assert_eq!(config.address, 40);
        assert_eq!(config.master_address, 1);
        assert_eq!(config.checksum_type, ChecksumType::Crc16);
        assert_eq!(config.read_timeout, Duration::from_millis(1000));
        assert_eq!(config.poll_period, Duration::from_millis(200));
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.liveness_attempts, 3);
    }

    #[test]
    fn test_setters_clamp() {
        let config = DeviceConfig::new(2)
            .with_checksum_type(ChecksumType::Simple)
            .with_history_capacity(0)
            .with_liveness_attempts(0);

        assert_eq!(config.checksum_type, ChecksumType::Simple);
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.liveness_attempts, 1);
    }
}
