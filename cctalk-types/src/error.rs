pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unrecognized event: resultA={result_a}, resultB={result_b}")]
    UnrecognizedEvent { result_a: u8, result_b: u8 },

    #[error("Invalid event buffer: expected {expected} data bytes, got {actual}")]
    InvalidEventBuffer { expected: usize, actual: usize },

    #[error("Event {0} is not a credit or pending credit event")]
    NotACreditEvent(String),
}
