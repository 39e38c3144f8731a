//! Observable Motion Signal
//!
//! The change-notifying value consumers watch. Holds the current
//! `MotionState`, suppresses duplicate publishes, and invokes registered
//! callbacks only on actual transitions. Polling via `get()` works
//! equally; subscribing is optional.
//!
//! Callbacks run on the publisher's thread. A consumer that needs its
//! updates on a particular thread (a UI loop, say) hands itself off in
//! the callback.

use super::motion::MotionState;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

type Callback = Box<dyn Fn(MotionState) + Send + Sync>;

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Shared, change-notifying motion state.
pub struct MotionSignal {
    state: RwLock<MotionState>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl MotionSignal {
    /// Create a signal in the initial `Stationary` state.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MotionState::Stationary),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current state.
    pub fn get(&self) -> MotionState {
        *self.state.read()
    }

    /// Whether the current state is `Moving`.
    pub fn is_moving(&self) -> bool {
        self.get().is_moving()
    }

    /// Publish a state. Duplicate states are suppressed; subscribers are
    /// notified only when the value actually changes.
    ///
    /// Returns true if the state changed.
    pub fn publish(&self, next: MotionState) -> bool {
        {
            let mut state = self.state.write();
            if *state == next {
                return false;
            }
            *state = next;
        }

        debug!(state = ?next, "motion state changed");

        let subscribers = self.subscribers.lock();
        for (_, callback) in subscribers.iter() {
            callback(next);
        }
        true
    }

    /// Register a callback invoked on every transition.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MotionState) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, Box::new(callback)));
        SubscriptionId(id)
    }

    /// Remove a subscription. Returns true if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id.0);
        subscribers.len() != before
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for MotionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MotionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionSignal")
            .field("state", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        let signal = MotionSignal::new();
        assert_eq!(signal.get(), MotionState::Stationary);
        assert!(!signal.is_moving());
    }

    #[test]
    fn test_publish_changes_state() {
        let signal = MotionSignal::new();
        assert!(signal.publish(MotionState::Moving));
        assert_eq!(signal.get(), MotionState::Moving);
    }

    #[test]
    fn test_duplicate_publish_suppressed() {
        let signal = MotionSignal::new();
        signal.publish(MotionState::Moving);
        assert!(!signal.publish(MotionState::Moving));
    }

    #[test]
    fn test_subscriber_sees_transitions_only() {
        let signal = MotionSignal::new();
        let notifications = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&notifications);
        signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.publish(MotionState::Moving);
        signal.publish(MotionState::Moving); // duplicate, suppressed
        signal.publish(MotionState::Stationary);
        signal.publish(MotionState::Stationary); // duplicate, suppressed

        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscriber_receives_new_state() {
        let signal = MotionSignal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        signal.subscribe(move |state| {
            sink.lock().push(state);
        });

        signal.publish(MotionState::Moving);
        signal.publish(MotionState::Stationary);

        assert_eq!(
            *seen.lock(),
            vec![MotionState::Moving, MotionState::Stationary]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let signal = MotionSignal::new();
        let notifications = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&notifications);
        let id = signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));

        signal.publish(MotionState::Moving);
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multiple_subscribers() {
        let signal = MotionSignal::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let ca = Arc::clone(&a);
        signal.subscribe(move |_| {
            ca.fetch_add(1, Ordering::SeqCst);
        });
        let cb = Arc::clone(&b);
        signal.subscribe(move |_| {
            cb.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(signal.subscriber_count(), 2);
        signal.publish(MotionState::Moving);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
