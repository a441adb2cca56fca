//! Error types for cctalk-core

use std::fmt;

/// Result type alias for cctalk-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Checksum carried by a frame, for either message variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// CRC-16/CCITT value
    Crc16(u16),

    /// Simple zero-sum checksum byte
    Simple(u8),
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc16(crc) => write!(f, "CRC 0x{:04X}", crc),
            Self::Simple(sum) => write!(f, "0x{:02X}", sum),
        }
    }
}

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Message too short: expected at least {minimum} bytes, got {actual} bytes")]
    MessageTooShort {
        minimum: usize,
        actual: usize,
    },

    /// Declared data length does not match the frame length
    #[error("Length mismatch: data length byte declares {declared} data byte(s) but frame holds {actual}")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Frame ended before all declared bytes were received
    #[error("Truncated message: expected {expected} bytes, received {actual}")]
    Truncated {
        expected: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected {expected}, received {received}")]
    ChecksumMismatch {
        expected: Checksum,
        received: Checksum,
    },

    /// Builder is missing a required field
    #[error("Cannot build message: missing {0}")]
    MissingField(&'static str),

    /// Simple checksum messages need a non-zero source address
    #[error("Cannot build message: source address must not be 0")]
    InvalidSource,

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Unknown header code
    #[error("Unknown header code: {0}")]
    UnknownHeader(u8),
}

impl Error {
    /// Check if this is a framing error (the frame's shape is wrong)
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::MessageTooShort { .. }
                | Self::LengthMismatch { .. }
                | Self::Truncated { .. }
        )
    }

    /// Check if this is an integrity error (the frame's shape is right, its content is not)
    pub fn is_checksum(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Check if this error was raised while building a message
    pub fn is_build(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::InvalidSource | Self::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let framing = Error::LengthMismatch { declared: 3, actual: 2 };
        let checksum = Error::ChecksumMismatch {
            expected: Checksum::Crc16(0x3F46),
            received: Checksum::Crc16(0x3F47),
        };

        assert!(framing.is_framing());
        assert!(!framing.is_checksum());
        assert!(checksum.is_checksum());
        assert!(!checksum.is_framing());
        assert!(Error::MissingField("header").is_build());
    }

    #[test]
    fn test_checksum_mismatch_message() {
        let err = Error::ChecksumMismatch {
            expected: Checksum::Crc16(0x3F46),
            received: Checksum::Crc16(0x0046),
        };

        assert_eq!(
            err.to_string(),
            "Checksum mismatch: expected CRC 0x3F46, received CRC 0x0046"
        );
    }
}
