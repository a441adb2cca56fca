//! ccTalk header (command) codes

use std::fmt;

use crate::error::{Error, Result};

/// ccTalk header codes
///
/// Only the headers this crate issues or expects are listed; a [`Message`]
/// carries its header as a raw `u8`, so any other code can still be sent.
///
/// [`Message`]: crate::Message
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Header {
    // Replies (from device)
    Reply = 0,
    Nak = 5,
    Busy = 6,

    // Encryption
    RequestEncryptionSupport = 111,

    // Bill validator
    RequestBillId = 157,
    ModifyBillId = 158,
    ReadBufferedBillEvents = 159,

    // Identification
    RequestBuildCode = 192,

    // Inhibits
    RequestMasterInhibitStatus = 227,
    ModifyMasterInhibitStatus = 228,
    RequestInhibitStatus = 230,
    ModifyInhibitStatus = 231,

    // Diagnostics
    PerformSelfCheck = 232,

    // Identification
    RequestProductCode = 244,
    RequestEquipmentCategoryId = 245,
    RequestManufacturerId = 246,

    // Liveness
    SimplePoll = 254,
}

impl Header {
    /// Check if this header only appears in device replies
    pub fn is_reply(self) -> bool {
        matches!(self, Self::Reply | Self::Nak | Self::Busy)
    }

    /// Get header name
    pub fn name(self) -> &'static str {
        match self {
            Self::Reply => "REPLY",
            Self::Nak => "NAK",
            Self::Busy => "BUSY",
            Self::RequestEncryptionSupport => "REQUEST_ENCRYPTION_SUPPORT",
            Self::RequestBillId => "REQUEST_BILL_ID",
            Self::ModifyBillId => "MODIFY_BILL_ID",
            Self::ReadBufferedBillEvents => "READ_BUFFERED_BILL_EVENTS",
            Self::RequestBuildCode => "REQUEST_BUILD_CODE",
            Self::RequestMasterInhibitStatus => "REQUEST_MASTER_INHIBIT_STATUS",
            Self::ModifyMasterInhibitStatus => "MODIFY_MASTER_INHIBIT_STATUS",
            Self::RequestInhibitStatus => "REQUEST_INHIBIT_STATUS",
            Self::ModifyInhibitStatus => "MODIFY_INHIBIT_STATUS",
            Self::PerformSelfCheck => "PERFORM_SELF_CHECK",
            Self::RequestProductCode => "REQUEST_PRODUCT_CODE",
            Self::RequestEquipmentCategoryId => "REQUEST_EQUIPMENT_CATEGORY_ID",
            Self::RequestManufacturerId => "REQUEST_MANUFACTURER_ID",
            Self::SimplePoll => "SIMPLE_POLL",
        }
    }
}

impl From<Header> for u8 {
    fn from(header: Header) -> u8 {
        header as u8
    }
}

impl TryFrom<u8> for Header {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Reply),
            5 => Ok(Self::Nak),
            6 => Ok(Self::Busy),
            111 => Ok(Self::RequestEncryptionSupport),
            157 => Ok(Self::RequestBillId),
            158 => Ok(Self::ModifyBillId),
            159 => Ok(Self::ReadBufferedBillEvents),
            192 => Ok(Self::RequestBuildCode),
            227 => Ok(Self::RequestMasterInhibitStatus),
            228 => Ok(Self::ModifyMasterInhibitStatus),
            230 => Ok(Self::RequestInhibitStatus),
            231 => Ok(Self::ModifyInhibitStatus),
            232 => Ok(Self::PerformSelfCheck),
            244 => Ok(Self::RequestProductCode),
            245 => Ok(Self::RequestEquipmentCategoryId),
            246 => Ok(Self::RequestManufacturerId),
            254 => Ok(Self::SimplePoll),
            _ => Err(Error::UnknownHeader(value)),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}
