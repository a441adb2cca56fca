//! Background event polling

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::reconciler::EventReconciler;

/// Reads the device event buffer periodically and feeds the reconciler
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use cctalk::{Device, DeviceConfig, EventPoller, EventReconciler};
///
/// #[tokio::main]
/// async fn main() -> cctalk::Result<()> {
///     let device = Arc::new(Device::tcp("192.168.1.50", 4001, DeviceConfig::new(40)));
///     device.initialise().await?;
///
///     let poller = EventPoller::start(device, EventReconciler::new(), Duration::from_millis(200));
///     tokio::time::sleep(Duration::from_secs(10)).await;
///
///     let reconciler = poller.stop(Duration::from_secs(2)).await?;
///     println!("last counter: {:?}", reconciler.last_counter());
///     Ok(())
/// }
/// ```
pub struct EventPoller {
    reconciler: Arc<Mutex<EventReconciler>>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl EventPoller {
    /// Spawn the polling task
    ///
    /// If `reconciler` has no baseline yet, the first successful read
    /// becomes the baseline.
    pub fn start(device: Arc<Device>, reconciler: EventReconciler, period: Duration) -> Self {
        let reconciler = Arc::new(Mutex::new(reconciler));
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(poll_loop(device, reconciler.clone(), period, stopped));

        Self {
            reconciler,
            stop,
            task,
        }
    }

    /// Spawn the polling task with the device's configured poll period
    pub fn for_device(device: Arc<Device>, reconciler: EventReconciler) -> Self {
        let period = device.config().poll_period;
        Self::start(device, reconciler, period)
    }

    /// Check if the polling task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Counter of the last snapshot accepted by the reconciler
    pub fn last_counter(&self) -> Option<u8> {
        self.reconciler.lock().last_counter()
    }

    /// Inspect the reconciler while polling
    ///
    /// Blocks the polling task for the duration of `f`.
    pub fn with_reconciler<T>(&self, f: impl FnOnce(&EventReconciler) -> T) -> T {
        f(&self.reconciler.lock())
    }

    /// Stop polling and return the reconciler
    ///
    /// A transaction in flight is allowed to finish.
    ///
    /// # Errors
    ///
    /// [`Error::PollerJoinTimeout`] if the task has not ended within
    /// `join_timeout`; the task is then aborted.
    pub async fn stop(mut self, join_timeout: Duration) -> Result<EventReconciler> {
        let _ = self.stop.send(true);

        match tokio::time::timeout(join_timeout, &mut self.task).await {
            Err(_) => {
                warn!("Event poller did not stop within {:?}, aborting", join_timeout);
                self.task.abort();
                return Err(Error::PollerJoinTimeout);
            }
            Ok(Err(e)) => warn!("Event poller task failed: {}", e),
            Ok(Ok(())) => {}
        }

        let reconciler = std::mem::take(&mut *self.reconciler.lock());
        Ok(reconciler)
    }
}

impl Drop for EventPoller {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

async fn poll_loop(
    device: Arc<Device>,
    reconciler: Arc<Mutex<EventReconciler>>,
    period: Duration,
    mut stopped: watch::Receiver<bool>,
) {
    info!("Event poller started for device {}", device.address());

    while !*stopped.borrow() {
        match device.read_buffered_events().await {
            Ok(snapshot) => {
                let outcome = reconciler.lock().feed(snapshot);
                if outcome.replayed > 0 {
                    debug!("{} new event(s)", outcome.replayed);
                }
            }
            Err(err) => {
                warn!("Event poll on device {} failed: {}", device.address(), err);
                reconciler.lock().report_poll_error(&err);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = stopped.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Event poller stopped for device {}", device.address());
}
