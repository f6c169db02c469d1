//! Observer channels for state changes and unhandled faults.
//!
//! An [`EventBus`] is a list of callbacks with explicit subscribe and
//! unsubscribe. Observers are cloned out of the bus before they are called,
//! so an observer may itself subscribe or unsubscribe.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Synchronous fan-out of events to subscribed observers.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use wirestate::events::EventBus;
///
/// let bus: EventBus<u32> = EventBus::new();
/// let total = Arc::new(AtomicUsize::new(0));
/// let sink = Arc::clone(&total);
///
/// let id = bus.subscribe(move |n| {
///     sink.fetch_add(*n as usize, Ordering::SeqCst);
/// });
/// assert_eq!(bus.emit(&5), 1);
///
/// assert!(bus.unsubscribe(id));
/// assert_eq!(bus.emit(&5), 0);
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
pub struct EventBus<E> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Observer<E>)>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Deliver `event` to every observer in subscription order, returning
    /// how many were notified.
    pub fn emit(&self, event: &E) -> usize {
        let observers: Vec<Observer<E>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in &observers {
            observer(event);
        }
        observers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.lock().len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A committed transition.
///
/// `from` is `None` for the very first transition of a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange<K> {
    pub from: Option<K>,
    pub to: K,
    /// 1-based count of commits made by the machine, this one included.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emit_reaches_observers_in_order() {
        let bus: EventBus<&'static str> = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            bus.subscribe(move |event| log.lock().push(format!("{tag}:{event}")));
        }

        assert_eq!(bus.emit(&"ping"), 2);
        assert_eq!(*log.lock(), vec!["first:ping", "second:ping"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus: EventBus<()> = EventBus::new();
        let id = bus.subscribe(|_| {});

        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn observer_may_unsubscribe_itself() {
        let bus: Arc<EventBus<u8>> = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let id = {
            let weak_bus = Arc::downgrade(&bus);
            let calls = Arc::clone(&calls);
            let own_id = Arc::clone(&own_id);
            bus.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let (Some(bus), Some(id)) = (weak_bus.upgrade(), *own_id.lock()) {
                    bus.unsubscribe(id);
                }
            })
        };
        *own_id.lock() = Some(id);

        assert_eq!(bus.emit(&1), 1);
        assert_eq!(bus.emit(&2), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
