//! High-level error types

use cctalk_transport::TransactionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] cctalk_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] cctalk_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] cctalk_types::Error),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Device not connected")]
    NotConnected,

    #[error("Unexpected response from device: {0}")]
    UnexpectedResponse(String),

    #[error("Device unreachable after {attempts} attempt(s)")]
    Unreachable { attempts: usize },

    #[error("Self check reported fault code {0}")]
    SelfCheckFault(u8),

    #[error("Event poller did not stop in time")]
    PollerJoinTimeout,
}

impl Error {
    /// Check if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Transaction(err) => matches!(
                err,
                TransactionError::Timeout { .. } | TransactionError::ResponseParse(_)
            ),
            Error::UnexpectedResponse(_) | Error::Types(_) => true,
            _ => false,
        }
    }
}
