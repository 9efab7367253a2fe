//! # Observable Values
//!
//! Change notification for telemetry statistics and UI-bound setpoints.
//!
//! ## Listeners
//!
//! A [`Listener`] receives a reference to the new value. Registration stores
//! a weak handle: the caller keeps the `Arc` alive, and a listener whose last
//! strong reference is dropped is pruned on the next notification.
//!
//! Listeners run synchronously on the thread that calls `set`/`notify`, in
//! registration order, with no internal lock held. A listener that returns
//! an error is logged and the remaining listeners still run. For delivery to
//! another thread or task, register a [`ChannelListener`].
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use adcs_bridge::error::Result;
//! use adcs_bridge::store::observable::ObservableValue;
//!
//! let value = ObservableValue::new(0.0, "stepper_X");
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let listener = Arc::new(move |_: &f64| -> Result<()> {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//! value.add_listener(&listener);
//!
//! value.set(10.0);
//! value.set(10.0); // unchanged, no notification
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{AdcsError, Result};

/// Receiver of change notifications
pub trait Listener<T>: Send + Sync {
    /// Called with the new value after every change
    fn on_change(&self, value: &T) -> Result<()>;
}

impl<T, F> Listener<T> for F
where
    F: Fn(&T) -> Result<()> + Send + Sync,
{
    fn on_change(&self, value: &T) -> Result<()> {
        self(value)
    }
}

/// Handle returned by `add_listener`, used to remove the registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered set of weakly held listeners
pub struct ListenerSet<T> {
    name: String,
    entries: Mutex<Vec<(ListenerId, Weak<dyn Listener<T>>)>>,
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("name", &self.name)
            .field("len", &lock(&self.entries).len())
            .finish()
    }
}

impl<T: 'static> ListenerSet<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener; it is held weakly
    pub fn add<L: Listener<T> + 'static>(&self, listener: &Arc<L>) -> ListenerId {
        let weak: Weak<dyn Listener<T>> = Arc::downgrade(listener) as Weak<dyn Listener<T>>;
        let id = ListenerId::next();
        lock(&self.entries).push((id, weak));
        id
    }

    /// Remove a registration.
    ///
    /// Returns `false` if `id` was not registered (already removed, or from
    /// another set).
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if !removed {
            debug!("{}: listener {:?} not found", self.name, id);
        }
        removed
    }

    /// Number of live registrations
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every live listener with `value`, in registration order.
    ///
    /// Returns the number of listeners that reported an error.
    pub fn notify(&self, value: &T) -> usize {
        let live: Vec<Arc<dyn Listener<T>>> = {
            let mut entries = lock(&self.entries);
            entries.retain(|(_, weak)| weak.strong_count() > 0);
            entries.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        let mut failures = 0;
        for listener in live {
            if let Err(e) = listener.on_change(value) {
                failures += 1;
                warn!("{}: listener failed: {}", self.name, e);
            }
        }
        failures
    }
}

/// Single value with change-triggered notification
pub struct ObservableValue<T> {
    value: Mutex<T>,
    listeners: ListenerSet<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableValue")
            .field("name", &self.listeners.name)
            .field("value", &*lock(&self.value))
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> {
    pub fn new(initial: T, name: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(initial),
            listeners: ListenerSet::new(name),
        }
    }

    /// Name given at construction, used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.listeners.name
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// Store `value` and notify listeners if it differs from the current one.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = lock(&self.value);
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.listeners.notify(&value);
        true
    }

    pub fn add_listener<L: Listener<T> + 'static>(&self, listener: &Arc<L>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove a listener; `false` if it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Listener that forwards each value into a tokio channel
///
/// Lets a consumer on another task receive notifications without running
/// inside the producer's call stack.
#[derive(Debug)]
pub struct ChannelListener<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Clone + Send + 'static> ChannelListener<T> {
    /// Create a listener and the receiving end of its channel
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl<T: Clone + Send + 'static> Listener<T> for ChannelListener<T> {
    fn on_change(&self, value: &T) -> Result<()> {
        self.tx
            .send(value.clone())
            .map_err(|_| AdcsError::Listener("receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use std::sync::atomic::AtomicUsize;

    mock! {
        pub F64Listener {}
        impl Listener<f64> for F64Listener {
            fn on_change(&self, value: &f64) -> Result<()>;
        }
    }

    fn recording_listener(
        log: Arc<Mutex<Vec<(usize, f64)>>>,
        tag: usize,
    ) -> Arc<impl Listener<f64>> {
        Arc::new(move |v: &f64| -> Result<()> {
            log.lock().unwrap().push((tag, *v));
            Ok(())
        })
    }

    #[test]
    fn test_set_equal_value_is_silent() {
        let value = ObservableValue::new(5.0, "test");
        let mut mock = MockF64Listener::new();
        mock.expect_on_change().times(0);
        let mock = Arc::new(mock);
        value.add_listener(&mock);

        assert!(!value.set(5.0));
        assert_eq!(value.get(), 5.0);
    }

    #[test]
    fn test_set_new_value_notifies_once_per_listener() {
        let value = ObservableValue::new(0.0, "test");
        let mut first = MockF64Listener::new();
        first
            .expect_on_change()
            .withf(|v: &f64| *v == 2.5)
            .times(1)
            .returning(|_| Ok(()));
        let mut second = MockF64Listener::new();
        second
            .expect_on_change()
            .withf(|v: &f64| *v == 2.5)
            .times(1)
            .returning(|_| Ok(()));
        let first = Arc::new(first);
        let second = Arc::new(second);
        value.add_listener(&first);
        value.add_listener(&second);

        assert!(value.set(2.5));
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let value = ObservableValue::new(0.0, "ordered");
        let a = recording_listener(log.clone(), 1);
        let b = recording_listener(log.clone(), 2);
        let c = recording_listener(log.clone(), 3);
        value.add_listener(&a);
        value.add_listener(&b);
        value.add_listener(&c);

        value.set(1.0);
        assert_eq!(*log.lock().unwrap(), vec![(1, 1.0), (2, 1.0), (3, 1.0)]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let value = ObservableValue::new(0u32, "isolated");
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(|_: &u32| -> Result<()> { Err(AdcsError::Listener("boom".into())) });
        let counter = calls.clone();
        let counting = Arc::new(move |_: &u32| -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        value.add_listener(&failing);
        value.add_listener(&counting);

        value.set(7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let value = ObservableValue::new(0.0, "removal");
        let a = recording_listener(log.clone(), 1);
        let id = value.add_listener(&a);

        assert!(value.remove_listener(id));
        assert!(!value.remove_listener(id), "second removal reports not found");

        value.set(3.0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let value = ObservableValue::new(0.0, "weak");
        let a = recording_listener(log.clone(), 1);
        value.add_listener(&a);
        assert_eq!(value.listener_count(), 1);

        drop(a);
        assert_eq!(value.listener_count(), 0);
        value.set(1.0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_may_read_value_during_notification() {
        let value = Arc::new(ObservableValue::new(0, "reentrant"));
        let seen = Arc::new(Mutex::new(None));
        let (v, s) = (value.clone(), seen.clone());
        let listener = Arc::new(move |_: &i32| -> Result<()> {
            *s.lock().unwrap() = Some(v.get());
            Ok(())
        });
        value.add_listener(&listener);

        value.set(9);
        assert_eq!(*seen.lock().unwrap(), Some(9));
    }

    #[test]
    fn test_listener_set_counts_failures() {
        let set = ListenerSet::<String>::new("lines");
        let ok = Arc::new(|_: &String| -> Result<()> { Ok(()) });
        let bad = Arc::new(|_: &String| -> Result<()> { Err(AdcsError::Listener("x".into())) });
        set.add(&ok);
        set.add(&bad);
        assert_eq!(set.len(), 2);
        assert_eq!(set.notify(&"line".to_string()), 1);
    }

    #[tokio::test]
    async fn test_channel_listener_forwards_values() {
        let value = ObservableValue::new(0.0, "channel");
        let (listener, mut rx) = ChannelListener::<f64>::new();
        value.add_listener(&listener);

        value.set(1.0);
        value.set(2.0);
        assert_eq!(rx.recv().await, Some(1.0));
        assert_eq!(rx.recv().await, Some(2.0));
    }

    #[test]
    fn test_channel_listener_reports_closed_receiver() {
        let (listener, rx) = ChannelListener::<u8>::new();
        drop(rx);
        assert!(listener.on_change(&1).is_err());
    }
}
