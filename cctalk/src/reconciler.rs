//! Event sequence reconciliation
//!
//! A bill validator only exposes its five newest events and an 8-bit event
//! counter. Successive snapshots are compared by counter distance to replay
//! each new event exactly once and in chronological order, and to detect
//! events that scrolled out of the buffer between two reads.

use std::collections::VecDeque;

use tracing::{debug, warn};

use cctalk_types::{EventRecord, EventSnapshot};

use crate::config::{DeviceConfig, DEFAULT_HISTORY_CAPACITY};
use crate::error::Error;

/// Events that scrolled out of the device buffer unseen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLoss {
    pub lost_count: usize,
    pub previous: EventSnapshot,
    pub current: EventSnapshot,
}

/// Receives reconciled events
///
/// Callbacks run synchronously on the feeding task and must not block.
pub trait EventListener {
    /// Called once per new event, oldest first
    fn on_new_event(&mut self, event: &EventRecord);

    /// Called when events were lost between two snapshots
    fn on_lost_events(&mut self, loss: &EventLoss);

    /// Called by the poller when reading the event buffer failed
    fn on_poll_error(&mut self, _error: &Error) {}
}

/// Result of feeding one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedOutcome {
    /// Events delivered to listeners
    pub replayed: usize,
    /// Events lost before this snapshot
    pub lost: usize,
}

/// Number of events between two counter values, modulo 256
///
/// ```
/// use cctalk::reconciler::forward_distance;
///
/// assert_eq!(forward_distance(250, 3), 9);
/// assert_eq!(forward_distance(3, 3), 0);
/// ```
pub fn forward_distance(last: u8, counter: u8) -> u8 {
    counter.wrapping_sub(last)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Tracking { last_counter: u8 },
}

/// Turns successive event buffer snapshots into a stream of new events
pub struct EventReconciler {
    state: State,
    history: VecDeque<EventSnapshot>,
    capacity: usize,
    listeners: Vec<Box<dyn EventListener + Send>>,
}

impl Default for EventReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventReconciler {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Reconciler keeping `config.history_capacity` snapshots
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::with_history_capacity(config.history_capacity)
    }

    /// Keep at most `capacity` snapshots (at least 1)
    pub fn with_history_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: State::Uninitialized,
            history: VecDeque::with_capacity(capacity),
            capacity,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn EventListener + Send>) {
        self.listeners.push(listener);
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Check if a baseline snapshot has been recorded
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Tracking { .. })
    }

    /// Counter of the last accepted snapshot
    pub fn last_counter(&self) -> Option<u8> {
        match self.state {
            State::Uninitialized => None,
            State::Tracking { last_counter } => Some(last_counter),
        }
    }

    /// Accepted snapshots, oldest first
    pub fn history(&self) -> impl Iterator<Item = &EventSnapshot> {
        self.history.iter()
    }

    /// Record `snapshot` as the baseline without replaying anything
    ///
    /// Discards any previous history.
    pub fn seed(&mut self, snapshot: EventSnapshot) {
        debug!("Event baseline at counter {}", snapshot.counter());

        self.history.clear();
        self.state = State::Tracking {
            last_counter: snapshot.counter(),
        };
        self.push_history(snapshot);
    }

    /// Process a new snapshot
    ///
    /// The first snapshot only establishes the baseline. Afterwards, every
    /// event past the previous counter is delivered once, oldest first.
    pub fn feed(&mut self, snapshot: EventSnapshot) -> FeedOutcome {
        let last_counter = match self.state {
            State::Uninitialized => {
                self.seed(snapshot);
                return FeedOutcome::default();
            }
            State::Tracking { last_counter } => last_counter,
        };

        let diff = forward_distance(last_counter, snapshot.counter()) as usize;
        if diff == 0 {
            return FeedOutcome::default();
        }

        let mut outcome = FeedOutcome::default();

        if diff > EventSnapshot::SLOTS {
            outcome.lost = diff - EventSnapshot::SLOTS;
            warn!(
                "Lost {} event(s) between counters {} and {}",
                outcome.lost,
                last_counter,
                snapshot.counter()
            );

            if let Some(previous) = self.history.back() {
                let loss = EventLoss {
                    lost_count: outcome.lost,
                    previous: previous.clone(),
                    current: snapshot.clone(),
                };
                for listener in &mut self.listeners {
                    listener.on_lost_events(&loss);
                }
            }
        }

        for record in snapshot.newest(diff).iter().rev() {
            for listener in &mut self.listeners {
                listener.on_new_event(record);
            }
            outcome.replayed += 1;
        }

        debug!(
            "Counter {} -> {}: {} new event(s)",
            last_counter,
            snapshot.counter(),
            outcome.replayed
        );

        self.state = State::Tracking {
            last_counter: snapshot.counter(),
        };
        self.push_history(snapshot);

        outcome
    }

    /// Forward a failed event buffer read to listeners
    pub fn report_poll_error(&mut self, error: &Error) {
        for listener in &mut self.listeners {
            listener.on_poll_error(error);
        }
    }

    fn push_history(&mut self, snapshot: EventSnapshot) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Seen {
        Event(u8),
        Lost(usize),
    }

    /// Records callbacks; bill type identifies each credit event
    struct Recorder(Arc<Mutex<Vec<Seen>>>);

    impl EventListener for Recorder {
        fn on_new_event(&mut self, event: &EventRecord) {
            self.0.lock().push(Seen::Event(event.result_a()));
        }

        fn on_lost_events(&mut self, loss: &EventLoss) {
            self.0.lock().push(Seen::Lost(loss.lost_count));
        }
    }

    fn recording() -> (EventReconciler, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut reconciler = EventReconciler::new();
        reconciler.add_listener(Box::new(Recorder(seen.clone())));
        (reconciler, seen)
    }

    /// Snapshot whose newest events are credits of bill types `newest`,
    /// newest first; remaining slots hold (0, 0)
    fn snapshot(counter: u8, newest: &[u8]) -> EventSnapshot {
        let mut records = [EventRecord::decode(0, 0).unwrap(); 5];
        for (slot, bill) in newest.iter().enumerate() {
            records[slot] = EventRecord::decode(*bill, 0).unwrap();
        }
        EventSnapshot::new(records, counter)
    }

    /// Device buffer after `counter` events, event n being bill type n
    fn device_buffer(counter: u8) -> EventSnapshot {
        let newest: Vec<u8> = (0..5u8)
            .map_while(|i| counter.checked_sub(i))
            .filter(|n| *n > 0)
            .collect();
        snapshot(counter, &newest)
    }

    fn events(seen: &[Seen]) -> Vec<u8> {
        seen.iter()
            .filter_map(|s| match s {
                Seen::Event(n) => Some(*n),
                Seen::Lost(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_forward_distance() {
        assert_eq!(forward_distance(250, 3), 9);
        assert_eq!(forward_distance(3, 3), 0);
        assert_eq!(forward_distance(255, 1), 2);
        assert_eq!(forward_distance(0, 255), 255);
    }

    #[test]
    fn test_first_feed_is_baseline() {
        let (mut reconciler, seen) = recording();
        assert!(!reconciler.is_initialized());
        assert_eq!(reconciler.last_counter(), None);

        let outcome = reconciler.feed(device_buffer(4));

        assert_eq!(outcome, FeedOutcome::default());
        assert!(seen.lock().is_empty());
        assert_eq!(reconciler.last_counter(), Some(4));
        assert_eq!(reconciler.history().count(), 1);
    }

    #[test]
    fn test_nineteen_events_in_order() {
        let (mut reconciler, seen) = recording();
        reconciler.seed(device_buffer(0));

        let mut replayed = 0;
        for counter in [1, 3, 8, 13, 15, 16, 19] {
            let outcome = reconciler.feed(device_buffer(counter));
            assert_eq!(outcome.lost, 0);
            replayed += outcome.replayed;
        }

        assert_eq!(replayed, 19);
        assert_eq!(events(&seen.lock()), (1..=19).collect::<Vec<u8>>());
        assert_eq!(reconciler.history().count(), 8);
    }

    #[test]
    fn test_loss_detected() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(device_buffer(1));

        let outcome = reconciler.feed(device_buffer(7));

        assert_eq!(
            outcome,
            FeedOutcome {
                replayed: 5,
                lost: 1
            }
        );
        assert_eq!(
            *seen.lock(),
            vec![
                Seen::Lost(1),
                Seen::Event(3),
                Seen::Event(4),
                Seen::Event(5),
                Seen::Event(6),
                Seen::Event(7),
            ]
        );
    }

    #[test]
    fn test_loss_carries_snapshots() {
        struct LossCapture(Arc<Mutex<Option<EventLoss>>>);

        impl EventListener for LossCapture {
            fn on_new_event(&mut self, _event: &EventRecord) {}

            fn on_lost_events(&mut self, loss: &EventLoss) {
                *self.0.lock() = Some(loss.clone());
            }
        }

        let captured = Arc::new(Mutex::new(None));
        let mut reconciler = EventReconciler::new();
        reconciler.add_listener(Box::new(LossCapture(captured.clone())));

        reconciler.feed(device_buffer(10));
        reconciler.feed(device_buffer(30));

        let loss = captured.lock().clone().unwrap();
        assert_eq!(loss.lost_count, 15);
        assert_eq!(loss.previous.counter(), 10);
        assert_eq!(loss.current.counter(), 30);
    }

    #[test]
    fn test_counter_wraparound() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(snapshot(250, &[]));

        let outcome = reconciler.feed(snapshot(253, &[53, 52, 51]));
        assert_eq!(outcome.replayed, 3);

        // 253 -> 3 crosses the wrap: 6 events, one of them lost
        let outcome = reconciler.feed(snapshot(3, &[63, 62, 61, 60, 59]));
        assert_eq!(
            outcome,
            FeedOutcome {
                replayed: 5,
                lost: 1
            }
        );

        let outcome = reconciler.feed(snapshot(5, &[65, 64]));
        assert_eq!(outcome.replayed, 2);

        assert_eq!(
            events(&seen.lock()),
            vec![51, 52, 53, 59, 60, 61, 62, 63, 64, 65]
        );
        assert_eq!(reconciler.last_counter(), Some(5));
    }

    #[test]
    fn test_wrap_from_255() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(snapshot(255, &[]));

        let outcome = reconciler.feed(snapshot(1, &[2, 1]));

        assert_eq!(outcome.replayed, 2);
        assert_eq!(events(&seen.lock()), vec![1, 2]);
    }

    #[test]
    fn test_same_counter_is_noop() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(device_buffer(3));
        reconciler.feed(device_buffer(5));

        let outcome = reconciler.feed(device_buffer(5));

        assert_eq!(outcome, FeedOutcome::default());
        assert_eq!(events(&seen.lock()), vec![4, 5]);
        assert_eq!(reconciler.history().count(), 2);
    }

    #[test]
    fn test_history_eviction() {
        let mut reconciler = EventReconciler::with_history_capacity(3);
        for counter in 1..=6 {
            reconciler.feed(device_buffer(counter));
        }

        let counters: Vec<u8> = reconciler.history().map(|s| s.counter()).collect();
        assert_eq!(counters, vec![4, 5, 6]);
    }

    #[test]
    fn test_history_capacity_minimum() {
        let mut reconciler = EventReconciler::with_history_capacity(0);
        reconciler.feed(device_buffer(1));
        reconciler.feed(device_buffer(2));

        let counters: Vec<u8> = reconciler.history().map(|s| s.counter()).collect();
        assert_eq!(counters, vec![2]);
    }

    #[test]
    fn test_history_capacity_from_config() {
        let config = DeviceConfig::new(40).with_history_capacity(2);
        let mut reconciler = EventReconciler::from_config(&config);
        for counter in 1..=4 {
            reconciler.feed(device_buffer(counter));
        }

        let counters: Vec<u8> = reconciler.history().map(|s| s.counter()).collect();
        assert_eq!(counters, vec![3, 4]);
    }

    #[test]
    fn test_seed_resets_baseline() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(device_buffer(2));
        reconciler.feed(device_buffer(4));

        reconciler.seed(device_buffer(40));
        assert_eq!(reconciler.history().count(), 1);

        reconciler.feed(device_buffer(41));
        assert_eq!(events(&seen.lock()), vec![3, 4, 41]);
    }

    #[test]
    fn test_clear_listeners() {
        let (mut reconciler, seen) = recording();
        reconciler.feed(device_buffer(1));
        reconciler.clear_listeners();

        let outcome = reconciler.feed(device_buffer(2));

        assert_eq!(outcome.replayed, 1);
        assert!(seen.lock().is_empty());
    }
}
