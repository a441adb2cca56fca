//! Transport errors

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Read timeout: expected {expected} bytes, received {received}")]
    ReadTimeout { expected: usize, received: usize },

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Reader task stopped")]
    ReaderStopped,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Failure of a single request/response transaction
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// No response byte arrived in time
    #[error("No response after {after:?}")]
    Timeout { after: Duration },

    #[error("Transport failure: {0}")]
    Io(#[source] Error),

    /// Response bytes arrived but could not be parsed
    #[error("Invalid response: {0}")]
    ResponseParse(#[source] cctalk_core::Error),
}

impl TransactionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransactionError::Timeout { .. })
    }
}

impl From<Error> for TransactionError {
    fn from(err: Error) -> Self {
        TransactionError::Io(err)
    }
}

impl From<cctalk_core::Error> for TransactionError {
    fn from(err: cctalk_core::Error) -> Self {
        TransactionError::ResponseParse(err)
    }
}
