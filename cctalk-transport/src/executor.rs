//! Request/response transaction executor
//!
//! A ccTalk bus is half duplex: the master writes a request and the addressed
//! device answers with exactly one frame. The executor serializes
//! transactions per device and reads responses on a dedicated reader task so
//! a response is never lost to a slow caller, even when the device answers
//! before the write call has returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use cctalk_core::{message::FRAME_OVERHEAD, ChecksumType, Message};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{error::Error, stream::deadline_after, TransactionError, Transport};

/// Extra time the caller waits beyond the read timeout, so the reader task
/// reports its own timeout rather than being cut off
pub const SCHEDULING_SLACK: Duration = Duration::from_millis(100);

type ReadResult = std::result::Result<Message, TransactionError>;

struct ReadJob {
    timeout: Duration,
    reply: oneshot::Sender<ReadResult>,
}

/// Executes request/response transactions over a shared [`Transport`]
pub struct TransactionExecutor {
    transport: Arc<dyn Transport>,
    lock: Mutex<()>,
    jobs: mpsc::Sender<ReadJob>,
    reader: JoinHandle<()>,
    /// Set when the last read failed; the rest of that response may still arrive
    stale: AtomicBool,
}

impl TransactionExecutor {
    /// Create an executor and spawn its reader task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, checksum_type: ChecksumType) -> Self {
        let (jobs, queue) = mpsc::channel(1);
        let reader = tokio::spawn(reader_loop(transport.clone(), checksum_type, queue));

        Self {
            transport,
            lock: Mutex::new(()),
            jobs,
            reader,
            stale: AtomicBool::new(false),
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send `request` and wait for the single response frame
    ///
    /// The read is queued before the request is written, so a response that
    /// is already buffered when this is called is still picked up. After a
    /// failed read, input still pending is discarded first so a late reply
    /// to the previous request is not taken for this one.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::Io`] if the write or the read fails
    /// - [`TransactionError::Timeout`] if no response byte arrives in time
    /// - [`TransactionError::ResponseParse`] if the response is malformed or
    ///   cut short
    pub async fn transact(&self, request: &Message, read_timeout: Duration) -> ReadResult {
        let _guard = self.lock.lock().await;

        if self.stale.swap(false, Ordering::SeqCst) {
            let discarded = self.transport.discard_input().await?;
            if discarded > 0 {
                debug!("Discarded {} byte(s) of a late response", discarded);
            }
        }

        let (reply, response) = oneshot::channel();
        self.jobs
            .send(ReadJob {
                timeout: read_timeout,
                reply,
            })
            .await
            .map_err(|_| Error::ReaderStopped)?;

        debug!("Transaction: {}", request);
        trace!("Request frame: {}", request.to_hex());
        self.transport.write(&request.encode()).await?;

        // Dropping `response` on any early return cancels the pending read
        let wait = read_timeout.saturating_add(SCHEDULING_SLACK);
        let result = match tokio::time::timeout(wait, response).await {
            Err(_) => Err(TransactionError::Timeout {
                after: read_timeout,
            }),
            Ok(Err(_)) => Err(Error::ReaderStopped.into()),
            Ok(Ok(result)) => result,
        };

        match &result {
            Ok(message) => debug!("Response: {}", message),
            Err(_) => self.stale.store(true, Ordering::SeqCst),
        }
        result
    }
}

impl Drop for TransactionExecutor {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn reader_loop(
    transport: Arc<dyn Transport>,
    checksum_type: ChecksumType,
    mut queue: mpsc::Receiver<ReadJob>,
) {
    while let Some(mut job) = queue.recv().await {
        let result = tokio::select! {
            result = read_message(transport.as_ref(), checksum_type, job.timeout) => result,
            _ = job.reply.closed() => {
                debug!("Read abandoned by caller");
                continue;
            }
        };

        let _ = job.reply.send(result);
    }
}

/// Read one complete frame within `timeout` and parse it
///
/// Reads the destination and data length bytes first, then the rest of the
/// frame, all under one deadline.
pub async fn read_message(
    transport: &dyn Transport,
    checksum_type: ChecksumType,
    timeout: Duration,
) -> ReadResult {
    let deadline = deadline_after(timeout);

    let head = transport
        .read(2, timeout)
        .await
        .map_err(|e| read_failure(e, 0, FRAME_OVERHEAD, timeout))?;

    let remaining = head[1] as usize + 3;
    let expected = head.len() + remaining;
    let tail = transport
        .read(remaining, deadline.saturating_duration_since(Instant::now()))
        .await
        .map_err(|e| read_failure(e, head.len(), expected, timeout))?;

    let mut frame = BytesMut::with_capacity(expected);
    frame.extend_from_slice(&head);
    frame.extend_from_slice(&tail);

    trace!("Response frame: {:02X?}", &frame[..]);

    Ok(Message::parse(checksum_type, &frame)?)
}

/// Map a transport read error, given how many bytes were already read
fn read_failure(
    err: Error,
    already: usize,
    expected: usize,
    timeout: Duration,
) -> TransactionError {
    match err {
        Error::ReadTimeout { received, .. } if already + received == 0 => {
            TransactionError::Timeout { after: timeout }
        }
        Error::ReadTimeout { received, .. } => {
            TransactionError::ResponseParse(cctalk_core::Error::Truncated {
                expected,
                actual: already + received,
            })
        }
        other => TransactionError::Io(other),
    }
}
