use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::{Listener, Listeners, Observable, Subscription, lock, notify};

/// Channel whose value is set directly.
///
/// Every [`set`](Writable::set) notifies all listeners, even when the new
/// value equals the old one. Clones share the same channel.
pub struct Writable<T> {
    shared: Arc<Mutex<State<T>>>,
}

struct State<T> {
    value: T,
    listeners: Listeners<T>,
}

impl<T> Writable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a channel holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State {
                value,
                listeners: Listeners::new(),
            })),
        }
    }

    /// Replaces the value and notifies every listener before returning.
    pub fn set(&self, value: T) {
        let (value, listeners) = {
            let mut state = lock(&self.shared);
            state.value = value;
            (state.value.clone(), state.listeners.snapshot())
        };
        notify(listeners, &value);
    }

    /// Sets the value to `updater(current)`.
    pub fn update(&self, updater: impl FnOnce(T) -> T) {
        let next = updater(self.get());
        self.set(next);
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        lock(&self.shared).value.clone()
    }

    /// Registers `listener` and replays the current value to it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, value) = {
            let mut state = lock(&self.shared);
            let id = state.listeners.insert(Arc::clone(&listener));
            (id, state.value.clone())
        };
        listener(&value);

        let weak: Weak<Mutex<State<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                lock(&shared).listeners.remove(id);
            }
        })
    }

    /// Returns the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).listeners.len()
    }
}

impl<T> Observable<T> for Writable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Writable::subscribe(self, listener)
    }

    fn get(&self) -> T {
        Writable::get(self)
    }
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("Writable")
            .field("value", &state.value)
            .field("subscribers", &state.listeners.len())
            .finish()
    }
}
