//! ccTalk message structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    error::{Checksum, Error, Result},
    header::Header,
};

/// Checksum scheme used on a ccTalk bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumType {
    /// CRC-16/CCITT, no source address on the wire
    #[default]
    Crc16,

    /// 8-bit zero-sum checksum, with a source address
    Simple,
}

/// Fixed bytes in every frame: destination, length, source/CRC LSB, header, checksum/CRC MSB
pub const FRAME_OVERHEAD: usize = 5;

/// Maximum number of data bytes in a single frame
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

/// Validate frame length and return the declared data length
fn check_frame(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < FRAME_OVERHEAD {
        return Err(Error::MessageTooShort {
            minimum: FRAME_OVERHEAD,
            actual: bytes.len(),
        });
    }

    let declared = bytes[1] as usize;
    let actual = bytes.len() - FRAME_OVERHEAD;
    if declared != actual {
        return Err(Error::LengthMismatch { declared, actual });
    }

    Ok(declared)
}

fn check_data_len(data: &Bytes) -> Result<()> {
    if data.len() > MAX_DATA_LEN {
        return Err(Error::PayloadTooLarge {
            size: data.len(),
            max: MAX_DATA_LEN,
        });
    }
    Ok(())
}

/// Standard message packet with CRC-16 checksum
///
/// # Frame Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │ Destination │ Data length │   CRC LSB   │   Header    │    Data     │   CRC MSB   │
/// │   1 byte    │   1 byte    │   1 byte    │   1 byte    │   N bytes   │   1 byte    │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// The CRC is computed over `[destination, data length, header, data...]`.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use cctalk_core::{CrcMessage, Header};
///
/// let poll = CrcMessage::new(40, Header::SimplePoll, Bytes::new()).unwrap();
/// assert_eq!(poll.encode().as_ref(), &[40, 0, 0xB6, 254, 0x21]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CrcMessage {
    destination: u8,
    header: u8,
    data: Bytes,
    crc: u16,
}

impl CrcMessage {
    /// Create a message, computing its CRC
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if `data` exceeds 255 bytes.
    pub fn new(destination: u8, header: impl Into<u8>, data: impl Into<Bytes>) -> Result<Self> {
        let header = header.into();
        let data = data.into();
        check_data_len(&data)?;

        let crc = Self::compute_crc(destination, header, &data);
        Ok(Self {
            destination,
            header,
            data,
            crc,
        })
    }

    fn compute_crc(destination: u8, header: u8, data: &[u8]) -> u16 {
        let mut feed = Vec::with_capacity(3 + data.len());
        feed.push(destination);
        feed.push(data.len() as u8);
        feed.push(header);
        feed.extend_from_slice(data);
        checksum::crc16_ccitt(&feed)
    }

    pub fn destination(&self) -> u8 {
        self.destination
    }

    pub fn header(&self) -> u8 {
        self.header
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Full CRC-16 value
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Least significant CRC byte (third byte on the wire)
    pub fn crc_lsb(&self) -> u8 {
        (self.crc & 0xFF) as u8
    }

    /// Most significant CRC byte (last byte on the wire)
    pub fn crc_msb(&self) -> u8 {
        (self.crc >> 8) as u8
    }

    /// Encode message to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.data.len());
        buf.put_u8(self.destination);
        buf.put_u8(self.data.len() as u8);
        buf.put_u8(self.crc_lsb());
        buf.put_u8(self.header);
        buf.put_slice(&self.data);
        buf.put_u8(self.crc_msb());
        buf
    }

    /// Parse and verify a CRC frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Frame is shorter than 5 bytes
    /// - Data length byte disagrees with the frame length
    /// - Transmitted CRC differs from the recomputed one
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let data_len = check_frame(bytes)?;

        let destination = bytes[0];
        let header = bytes[3];
        let data = Bytes::copy_from_slice(&bytes[4..4 + data_len]);
        let received = u16::from_be_bytes([bytes[bytes.len() - 1], bytes[2]]);

        let message = Self::new(destination, header, data)?;
        if message.crc != received {
            return Err(Error::ChecksumMismatch {
                expected: Checksum::Crc16(message.crc),
                received: Checksum::Crc16(received),
            });
        }

        Ok(message)
    }
}

/// Standard message packet with simple checksum
///
/// # Frame Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │ Destination │ Data length │   Source    │   Header    │    Data     │  Checksum   │
/// │   1 byte    │   1 byte    │   1 byte    │   1 byte    │   N bytes   │   1 byte    │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// The 8-bit sum of every byte, checksum included, is zero.
#[derive(Clone, PartialEq, Eq)]
pub struct SimpleMessage {
    destination: u8,
    source: u8,
    header: u8,
    data: Bytes,
    checksum: u8,
}

impl SimpleMessage {
    /// Create a message, computing its checksum
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if `data` exceeds 255 bytes.
    pub fn new(
        destination: u8,
        source: u8,
        header: impl Into<u8>,
        data: impl Into<Bytes>,
    ) -> Result<Self> {
        let header = header.into();
        let data = data.into();
        check_data_len(&data)?;

        let checksum = checksum::simple_checksum(destination, source, header, &data);
        Ok(Self {
            destination,
            source,
            header,
            data,
            checksum,
        })
    }

    pub fn destination(&self) -> u8 {
        self.destination
    }

    pub fn source(&self) -> u8 {
        self.source
    }

    pub fn header(&self) -> u8 {
        self.header
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Encode message to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.data.len());
        buf.put_u8(self.destination);
        buf.put_u8(self.data.len() as u8);
        buf.put_u8(self.source);
        buf.put_u8(self.header);
        buf.put_slice(&self.data);
        buf.put_u8(self.checksum);
        buf
    }

    /// Parse and verify a simple checksum frame
    ///
    /// Parsing accepts any source address, including 0; only the builder
    /// enforces a non-zero source.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let data_len = check_frame(bytes)?;

        let destination = bytes[0];
        let source = bytes[2];
        let header = bytes[3];
        let data = Bytes::copy_from_slice(&bytes[4..4 + data_len]);
        let received = bytes[bytes.len() - 1];

        let message = Self::new(destination, source, header, data)?;
        if message.checksum != received {
            return Err(Error::ChecksumMismatch {
                expected: Checksum::Simple(message.checksum),
                received: Checksum::Simple(received),
            });
        }

        Ok(message)
    }
}

/// A ccTalk message of either checksum variant
#[derive(Clone, PartialEq, Eq)]
pub enum Message {
    Crc(CrcMessage),
    Simple(SimpleMessage),
}

impl Message {
    /// Parse a frame of the given variant
    ///
    /// # Examples
    ///
    /// ```
    /// use cctalk_core::{ChecksumType, Message};
    ///
    /// // ACK from a device to the master
    /// let ack = Message::parse(ChecksumType::Crc16, &[1, 0, 0x30, 0, 0x37]).unwrap();
    /// assert!(ack.is_ack());
    /// ```
    pub fn parse(checksum_type: ChecksumType, bytes: &[u8]) -> Result<Self> {
        match checksum_type {
            ChecksumType::Crc16 => CrcMessage::parse(bytes).map(Self::Crc),
            ChecksumType::Simple => SimpleMessage::parse(bytes).map(Self::Simple),
        }
    }

    pub fn checksum_type(&self) -> ChecksumType {
        match self {
            Self::Crc(_) => ChecksumType::Crc16,
            Self::Simple(_) => ChecksumType::Simple,
        }
    }

    pub fn destination(&self) -> u8 {
        match self {
            Self::Crc(m) => m.destination(),
            Self::Simple(m) => m.destination(),
        }
    }

    /// Source address (simple checksum variant only)
    pub fn source(&self) -> Option<u8> {
        match self {
            Self::Crc(_) => None,
            Self::Simple(m) => Some(m.source()),
        }
    }

    pub fn header(&self) -> u8 {
        match self {
            Self::Crc(m) => m.header(),
            Self::Simple(m) => m.header(),
        }
    }

    pub fn data(&self) -> &Bytes {
        match self {
            Self::Crc(m) => m.data(),
            Self::Simple(m) => m.data(),
        }
    }

    pub fn checksum(&self) -> Checksum {
        match self {
            Self::Crc(m) => Checksum::Crc16(m.crc()),
            Self::Simple(m) => Checksum::Simple(m.checksum()),
        }
    }

    /// Encode message to bytes
    pub fn encode(&self) -> BytesMut {
        match self {
            Self::Crc(m) => m.encode(),
            Self::Simple(m) => m.encode(),
        }
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        FRAME_OVERHEAD + self.data().len()
    }

    /// Check if this is an ACK: reply header and no data
    pub fn is_ack(&self) -> bool {
        self.header() == u8::from(Header::Reply) && self.data().is_empty()
    }

    /// Check if this is a NAK reply
    pub fn is_nak(&self) -> bool {
        self.header() == u8::from(Header::Nak)
    }

    /// Check if this is a BUSY reply
    pub fn is_busy(&self) -> bool {
        self.header() == u8::from(Header::Busy)
    }

    /// Uppercase hex rendering of the encoded frame
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.encode())
    }
}

impl From<CrcMessage> for Message {
    fn from(message: CrcMessage) -> Self {
        Self::Crc(message)
    }
}

impl From<SimpleMessage> for Message {
    fn from(message: SimpleMessage) -> Self {
        Self::Simple(message)
    }
}

impl fmt::Debug for CrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrcMessage")
            .field("destination", &self.destination)
            .field("header", &self.header)
            .field("data", &hex::encode_upper(&self.data))
            .field("crc", &format!("0x{:04X}", self.crc))
            .finish()
    }
}

impl fmt::Debug for SimpleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleMessage")
            .field("destination", &self.destination)
            .field("source", &self.source)
            .field("header", &self.header)
            .field("data", &hex::encode_upper(&self.data))
            .field("checksum", &format!("0x{:02X}", self.checksum))
            .finish()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc(m) => m.fmt(f),
            Self::Simple(m) => m.fmt(f),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = Header::try_from(self.header())
            .map(|h| h.to_string())
            .unwrap_or_else(|_| self.header().to_string());
        write!(
            f,
            "Message[{}](dest={}, len={}, {})",
            header,
            self.destination(),
            self.data().len(),
            self.checksum()
        )
    }
}
