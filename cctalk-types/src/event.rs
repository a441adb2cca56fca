//! Bill validator event structures
//!
//! A bill validator keeps its last five events in a ring buffer, each as a
//! `(resultA, resultB)` byte pair, together with an 8-bit event counter that
//! increments (and wraps 255 → 0) on every new event.

use std::fmt;

use crate::error::{Error, Result};

/// Broad event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Credit,
    PendingCredit,
    Status,
    Reject,
    FatalError,
    FraudAttempt,
}

/// Specific event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BillValidatedCashbox,
    BillValidatedEscrow,
    MasterInhibitActive,
    BillReturnedFromEscrow,
    InvalidBillValidationFail,
    InvalidBillTransportFail,
    InhibitedBillSerial,
    InhibitedBillDipSwitch,
    BillJammedTransportUnsafe,
    BillJammedStacker,
    BillPulledBackwards,
    BillTamper,
    StackerOk,
    StackerRemoved,
    StackerInserted,
    StackerFaulty,
    StackerFull,
    StackerJammed,
    BillJammedTransportSafe,
    OptoFraudDetected,
    StringFraudDetected,
    AntiStringMechanismFaulty,
    BarcodeDetected,
    UnknownBillTypeStacked,
    NoteJamCleared,
}

/// Status events, keyed on resultB when resultA is 0
const STATUS_TABLE: [(EventCategory, EventKind); 23] = {
    use EventCategory::*;
    use EventKind::*;
    [
        (Status, MasterInhibitActive),
        (Status, BillReturnedFromEscrow),
        (Reject, InvalidBillValidationFail),
        (Reject, InvalidBillTransportFail),
        (Status, InhibitedBillSerial),
        (Status, InhibitedBillDipSwitch),
        (FatalError, BillJammedTransportUnsafe),
        (FatalError, BillJammedStacker),
        (FraudAttempt, BillPulledBackwards),
        (FraudAttempt, BillTamper),
        (Status, StackerOk),
        (Status, StackerRemoved),
        (Status, StackerInserted),
        (FatalError, StackerFaulty),
        (Status, StackerFull),
        (FatalError, StackerJammed),
        (FatalError, BillJammedTransportSafe),
        (FraudAttempt, OptoFraudDetected),
        (FraudAttempt, StringFraudDetected),
        (FatalError, AntiStringMechanismFaulty),
        (Status, BarcodeDetected),
        (Status, UnknownBillTypeStacked),
        (Status, NoteJamCleared),
    ]
};

/// A single decoded event
///
/// # Examples
///
/// ```
/// use cctalk_types::{EventCategory, EventKind, EventRecord};
///
/// let credit = EventRecord::decode(3, 0).unwrap();
/// assert_eq!(credit.category(), EventCategory::Credit);
/// assert_eq!(credit.kind(), EventKind::BillValidatedCashbox);
/// assert_eq!(credit.bill_type().unwrap(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRecord {
    result_a: u8,
    result_b: u8,
    category: EventCategory,
    kind: EventKind,
}

impl EventRecord {
    /// Decode a `(resultA, resultB)` pair
    ///
    /// A non-zero `result_a` is a bill type and only pairs with `result_b`
    /// 0 (credit) or 1 (pending credit, bill held in escrow).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedEvent`] for any pair outside the table.
    pub fn decode(result_a: u8, result_b: u8) -> Result<Self> {
        let (category, kind) = if result_a > 0 {
            match result_b {
                0 => (EventCategory::Credit, EventKind::BillValidatedCashbox),
                1 => (EventCategory::PendingCredit, EventKind::BillValidatedEscrow),
                _ => return Err(Error::UnrecognizedEvent { result_a, result_b }),
            }
        } else {
            *STATUS_TABLE
                .get(result_b as usize)
                .ok_or(Error::UnrecognizedEvent { result_a, result_b })?
        };

        Ok(Self {
            result_a,
            result_b,
            category,
            kind,
        })
    }

    pub fn result_a(&self) -> u8 {
        self.result_a
    }

    pub fn result_b(&self) -> u8 {
        self.result_b
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Check if this event carries a bill (credit or pending credit)
    pub fn is_credit(&self) -> bool {
        matches!(
            self.category,
            EventCategory::Credit | EventCategory::PendingCredit
        )
    }

    /// Bill type of a credit or pending credit event
    pub fn bill_type(&self) -> Result<u8> {
        if !self.is_credit() {
            return Err(Error::NotACreditEvent(self.to_string()));
        }
        Ok(self.result_a)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}[{}, {}]",
            self.category, self.kind, self.result_a, self.result_b
        )
    }
}

/// Number of event slots in the device buffer
pub const EVENT_SLOTS: usize = 5;

/// Contents of the device event buffer read in one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    /// Newest first
    records: [EventRecord; EVENT_SLOTS],
    counter: u8,
}

impl EventSnapshot {
    /// Number of events held by the device buffer
    pub const SLOTS: usize = EVENT_SLOTS;

    /// Length of the buffered events response payload
    pub const PAYLOAD_LEN: usize = 1 + 2 * Self::SLOTS;

    /// Create a snapshot from records ordered newest first
    pub fn new(records: [EventRecord; EVENT_SLOTS], counter: u8) -> Self {
        Self { records, counter }
    }

    /// Decode a buffered events payload: `[counter, a1, b1, ..., a5, b5]`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEventBuffer`] if the payload is not 11 bytes
    /// - [`Error::UnrecognizedEvent`] if any slot holds an unknown pair
    pub fn from_response_data(data: &[u8]) -> Result<Self> {
        if data.len() != Self::PAYLOAD_LEN {
            return Err(Error::InvalidEventBuffer {
                expected: Self::PAYLOAD_LEN,
                actual: data.len(),
            });
        }

        let counter = data[0];
        let mut decoded = Vec::with_capacity(Self::SLOTS);
        for pair in data[1..].chunks_exact(2) {
            decoded.push(EventRecord::decode(pair[0], pair[1])?);
        }

        let records: [EventRecord; EVENT_SLOTS] =
            decoded
                .try_into()
                .map_err(|_| Error::InvalidEventBuffer {
                    expected: Self::PAYLOAD_LEN,
                    actual: data.len(),
                })?;

        Ok(Self { records, counter })
    }

    /// All records, newest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Device event counter at the time of the read
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// The `count` newest records, newest first (at most [`SLOTS`](Self::SLOTS))
    pub fn newest(&self, count: usize) -> &[EventRecord] {
        &self.records[..count.min(Self::SLOTS)]
    }
}

impl fmt::Display for EventSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|", self.counter)?;
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", record)?;
        }
        write!(f, "]")
    }
}
