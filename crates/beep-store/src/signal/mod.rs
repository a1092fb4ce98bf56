//! Reactive channels.
//!
//! A channel holds a current value, replays it to every new subscriber and
//! pushes later changes synchronously, in call order:
//! - `Writable<T>`: value set directly by its owner
//! - `Readable<T>`: value produced by a start function that runs only while
//!   the channel has subscribers
//! - `Subscription`: RAII handle, dropping it unsubscribes
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use beep_store::signal::{Observable, Writable};
//!
//! let counter = Writable::new(0);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = counter.subscribe(move |v| sink.lock().unwrap().push(*v));
//! counter.set(1);
//! counter.update(|v| v + 1);
//! subscription.unsubscribe();
//! counter.set(10);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
//! ```

mod poll;
mod readable;
mod subscription;
mod writable;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) use poll::poll_every;
pub use readable::{Readable, Setter, StopHandle};
pub use subscription::Subscription;
pub use writable::Writable;

/// Subscribable value stream with replay-on-subscribe.
pub trait Observable<T> {
    /// Registers `listener`, calls it once with the current value and then
    /// on every change until the returned [`Subscription`] is dropped.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;

    /// Returns a copy of the current value.
    fn get(&self) -> T;
}

pub(crate) type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A listener plus a flag cleared when it is removed, so a fan-out already
/// in progress skips it.
pub(crate) struct Registered<T> {
    active: AtomicBool,
    listener: Listener<T>,
}

/// Registered listeners in subscription order.
pub(crate) struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Arc<Registered<T>>)>,
}

impl<T> Listeners<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, listener: Listener<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let registered = Registered {
            active: AtomicBool::new(true),
            listener,
        };
        self.entries.push((id, Arc::new(registered)));
        id
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let Some(index) = self.entries.iter().position(|(entry_id, _)| *entry_id == id) else {
            return false;
        };
        let (_, registered) = self.entries.remove(index);
        registered.active.store(false, Ordering::SeqCst);
        true
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the listener list so it can be called without holding a lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Registered<T>>> {
        self.entries.iter().map(|(_, r)| Arc::clone(r)).collect()
    }
}

/// Locks a mutex, recovering the data if a listener panicked while it was held.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls each listener still registered at the time of its turn.
pub(crate) fn notify<T>(listeners: Vec<Arc<Registered<T>>>, value: &T) {
    for registered in listeners {
        if registered.active.load(Ordering::SeqCst) {
            (registered.listener)(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_keep_order_and_ids() {
        let mut listeners: Listeners<u8> = Listeners::new();
        let a = listeners.insert(Arc::new(|_: &u8| {}));
        let b = listeners.insert(Arc::new(|_: &u8| {}));
        assert_ne!(a, b);
        assert_eq!(listeners.len(), 2);

        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.len(), 1);
        assert!(listeners.remove(b));
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_removed_listener_skipped_by_pending_fan_out() {
        let mut listeners: Listeners<u8> = Listeners::new();
        let calls = Arc::new(Mutex::new(Vec::<u8>::new()));

        let sink = Arc::clone(&calls);
        let a = listeners.insert(Arc::new(move |v: &u8| sink.lock().unwrap().push(*v)));
        let sink = Arc::clone(&calls);
        let b = listeners.insert(Arc::new(move |v: &u8| sink.lock().unwrap().push(*v + 100)));

        let pending = listeners.snapshot();
        assert!(listeners.remove(b));
        notify(pending, &1);

        assert_eq!(*calls.lock().unwrap(), vec![1]);
        assert!(listeners.remove(a));
    }
}
