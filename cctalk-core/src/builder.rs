//! Fluent message builder

use bytes::Bytes;

use crate::{
    error::{Error, Result},
    message::{ChecksumType, CrcMessage, Message, SimpleMessage},
};

/// Accumulates message fields and builds a [`Message`] of one checksum variant
///
/// Required fields are checked once in [`build`](Self::build), before any
/// construction is attempted.
///
/// # Examples
///
/// ```
/// use cctalk_core::{ChecksumType, Header, MessageBuilder};
///
/// let poll = MessageBuilder::new(ChecksumType::Simple)
///     .destination(2)
///     .source(1)
///     .header(Header::SimplePoll)
///     .build()
///     .unwrap();
///
/// assert_eq!(poll.source(), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    checksum_type: ChecksumType,
    destination: Option<u8>,
    source: Option<u8>,
    header: Option<u8>,
    data: Bytes,
}

impl MessageBuilder {
    /// Create a builder for the given checksum variant, with no data
    pub fn new(checksum_type: ChecksumType) -> Self {
        Self {
            checksum_type,
            ..Self::default()
        }
    }

    pub fn destination(mut self, destination: u8) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Set the source address (ignored by the CRC variant)
    pub fn source(mut self, source: u8) -> Self {
        self.source = Some(source);
        self
    }

    pub fn header(mut self, header: impl Into<u8>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Build the message
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if destination or header is unset, or if the
    ///   source is unset for the simple checksum variant
    /// - [`Error::InvalidSource`] if the simple checksum variant has source 0
    /// - [`Error::PayloadTooLarge`] if data exceeds 255 bytes
    pub fn build(self) -> Result<Message> {
        let destination = self.destination.ok_or(Error::MissingField("destination"))?;
        let header = self.header.ok_or(Error::MissingField("header"))?;

        match self.checksum_type {
            ChecksumType::Crc16 => Ok(CrcMessage::new(destination, header, self.data)?.into()),
            ChecksumType::Simple => {
                let source = match self.source {
                    None => return Err(Error::MissingField("source")),
                    Some(0) => return Err(Error::InvalidSource),
                    Some(source) => source,
                };
                Ok(SimpleMessage::new(destination, source, header, self.data)?.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_crc_message() {
        let message = MessageBuilder::new(ChecksumType::Crc16)
            .destination(40)
            .header(Header::ReadBufferedBillEvents)
            .build()
            .unwrap();

        assert_eq!(message.encode().as_ref(), &[40, 0, 0x31, 159, 0x5D]);
    }

    #[test]
    fn test_build_crc_ignores_source() {
        let with_source = MessageBuilder::new(ChecksumType::Crc16)
            .destination(40)
            .source(1)
            .header(254)
            .build()
            .unwrap();
        let without_source = MessageBuilder::new(ChecksumType::Crc16)
            .destination(40)
            .header(254)
            .build()
            .unwrap();

        assert_eq!(with_source, without_source);
    }

    #[test]
    fn test_build_with_data() {
        let message = MessageBuilder::new(ChecksumType::Crc16)
            .destination(40)
            .header(Header::ModifyMasterInhibitStatus)
            .data(vec![1u8])
            .build()
            .unwrap();

        assert_eq!(message.encode().as_ref(), &[40, 1, 0xEA, 228, 1, 0x49]);
    }

    #[test]
    fn test_build_simple_message() {
        let message = MessageBuilder::new(ChecksumType::Simple)
            .destination(1)
            .source(2)
            .header(0)
            .build()
            .unwrap();

        assert_eq!(message.encode().as_ref(), &[1, 0, 2, 0, 253]);
    }

    #[test]
    fn test_missing_destination() {
        let result = MessageBuilder::new(ChecksumType::Crc16).header(254).build();
        assert_eq!(result, Err(Error::MissingField("destination")));
    }

    #[test]
    fn test_missing_header() {
        let result = MessageBuilder::new(ChecksumType::Crc16).destination(40).build();
        assert_eq!(result, Err(Error::MissingField("header")));
    }

    #[test]
    fn test_simple_missing_source() {
        let result = MessageBuilder::new(ChecksumType::Simple)
            .destination(40)
            .header(254)
            .build();
        assert_eq!(result, Err(Error::MissingField("source")));
    }

    #[test]
    fn test_simple_zero_source() {
        let result = MessageBuilder::new(ChecksumType::Simple)
            .destination(40)
            .source(0)
            .header(254)
            .build();
        assert_eq!(result, Err(Error::InvalidSource));
    }

    #[test]
    fn test_payload_too_large() {
        let result = MessageBuilder::new(ChecksumType::Simple)
            .destination(40)
            .source(1)
            .header(254)
            .data(vec![0u8; 300])
            .build();

        assert_eq!(
            result,
            Err(Error::PayloadTooLarge {
                size: 300,
                max: 255
            })
        );
    }
}
