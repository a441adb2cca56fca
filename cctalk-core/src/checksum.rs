//! ccTalk checksum algorithms
//!
//! ccTalk frames carry one of two integrity checks:
//! 1. CRC-16/CCITT: poly 0x1021, init 0x0000, MSB-first, no reflection, no final XOR
//! 2. Simple checksum: one byte making the 8-bit sum of the whole frame zero

use tracing::trace;

/// CRC-16/CCITT generator polynomial (x^16 + x^12 + x^5 + 1)
pub const CRC16_POLYNOMIAL: u16 = 0x1021;

/// Calculate the CRC-16/CCITT of `bytes`
///
/// # Algorithm
///
/// ```text
/// crc = 0x0000
/// for each byte, for each bit from MSB to LSB:
///     c15 = top bit of crc
///     crc <<= 1
///     if c15 xor bit: crc ^= 0x1021
/// ```
///
/// # Examples
///
/// ```
/// use cctalk_core::checksum;
///
/// assert_eq!(checksum::crc16_ccitt(&[40, 0, 1]), 0x3F46);
/// ```
pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;

    for &byte in bytes {
        for i in 0..8 {
            let bit = (byte >> (7 - i)) & 1 == 1;
            let c15 = (crc >> 15) & 1 == 1;
            crc <<= 1;
            if c15 ^ bit {
                crc ^= CRC16_POLYNOMIAL;
            }
        }
    }

    trace!(
        len = bytes.len(),
        crc = format!("0x{:04X}", crc),
        "Calculated CRC-16/CCITT"
    );

    crc
}

/// Calculate the simple (zero-sum) checksum of a frame
///
/// Sums `destination + source + header + data.len() + Σdata`, keeps the
/// least significant byte and returns its two's complement, so that the sum
/// of every frame byte including the checksum is 0 modulo 256.
///
/// # Examples
///
/// ```
/// use cctalk_core::checksum;
///
/// assert_eq!(checksum::simple_checksum(1, 2, 0, &[]), 253);
/// ```
pub fn simple_checksum(destination: u8, source: u8, header: u8, data: &[u8]) -> u8 {
    let mut sum: u32 = destination as u32 + source as u32 + header as u32 + data.len() as u32;
    for &byte in data {
        sum += byte as u32;
    }

    let low = (sum & 0xFF) as u8;
    let checksum = low.wrapping_neg();

    trace!(
        destination = destination,
        source = source,
        header = header,
        data_len = data.len(),
        checksum = checksum,
        "Calculated simple checksum"
    );

    checksum
}

/// Verify a CRC-16/CCITT
pub fn verify_crc16(bytes: &[u8], expected: u16) -> bool {
    crc16_ccitt(bytes) == expected
}

/// Verify a simple checksum
pub fn verify_simple(destination: u8, source: u8, header: u8, data: &[u8], expected: u8) -> bool {
    simple_checksum(destination, source, header, data) == expected
}
