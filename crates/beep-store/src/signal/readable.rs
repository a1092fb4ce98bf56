use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::{Listener, Listeners, Observable, Subscription, lock, notify};
use crate::TRACING_TARGET_SIGNAL;

type StartFn<T> = dyn Fn(Setter<T>) -> StopHandle + Send + Sync;

/// Cleanup returned by a [`Readable`] start function.
///
/// Runs once, when the last subscriber leaves or when the channel is dropped
/// while observed.
#[must_use = "dropping a StopHandle runs it immediately"]
pub struct StopHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl StopHandle {
    /// Wraps a cleanup function.
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Cleanup that does nothing.
    pub fn noop() -> Self {
        Self { stop: None }
    }

    /// Runs the cleanup now.
    pub fn stop(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("pending", &self.stop.is_some())
            .finish()
    }
}

/// Channel whose value is produced by a start function.
///
/// The start function runs on the zero-to-one subscriber transition and
/// receives a [`Setter`]; the [`StopHandle`] it returns runs on the
/// one-to-zero transition. Listeners are notified only when the value
/// changes.
pub struct Readable<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// Held across start/stop so subscriber transitions are serialized.
    lifecycle: Mutex<Option<StopHandle>>,
    start: Box<StartFn<T>>,
}

struct State<T> {
    value: T,
    listeners: Listeners<T>,
}

impl<T> Shared<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn set(&self, value: T) {
        let changed = {
            let mut state = lock(&self.state);
            if state.value == value {
                None
            } else {
                state.value = value;
                Some((state.value.clone(), state.listeners.snapshot()))
            }
        };

        if let Some((value, listeners)) = changed {
            notify(listeners, &value);
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut lifecycle = lock(&self.lifecycle);
        let now_empty = {
            let mut state = lock(&self.state);
            state.listeners.remove(id) && state.listeners.is_empty()
        };

        if now_empty && let Some(stop) = lifecycle.take() {
            tracing::trace!(target: TRACING_TARGET_SIGNAL, "Last subscriber left, stopping");
            stop.stop();
        }
    }
}

/// Write access handed to a [`Readable`] start function.
///
/// Holds only a weak reference, so a running producer does not keep the
/// channel alive.
pub struct Setter<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Publishes `value`. Returns `false` once the channel has been dropped.
    pub fn set(&self, value: T) -> bool {
        match self.shared.upgrade() {
            Some(shared) => {
                shared.set(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> Readable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a channel holding `initial` that runs `start` while observed.
    pub fn new<F>(initial: T, start: F) -> Self
    where
        F: Fn(Setter<T>) -> StopHandle + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: initial,
                    listeners: Listeners::new(),
                }),
                lifecycle: Mutex::new(None),
                start: Box::new(start),
            }),
        }
    }

    /// Creates a channel that always holds `value`.
    pub fn constant(value: T) -> Self {
        Self::new(value, |_| StopHandle::noop())
    }

    /// Registers `listener` and replays the current value to it, starting the
    /// producer first if this is the only subscriber.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, value) = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            if lifecycle.is_none() {
                tracing::trace!(target: TRACING_TARGET_SIGNAL, "First subscriber, starting");
                let setter = Setter {
                    shared: Arc::downgrade(&self.shared),
                };
                *lifecycle = Some((self.shared.start)(setter));
            }

            let mut state = lock(&self.shared.state);
            let id = state.listeners.insert(Arc::clone(&listener));
            (id, state.value.clone())
        };
        listener(&value);

        let weak = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.unsubscribe(id);
            }
        })
    }

    /// Returns a copy of the current value.
    ///
    /// Does not start the producer, so an unobserved channel returns the last
    /// value it published.
    pub fn get(&self) -> T {
        lock(&self.shared.state).value.clone()
    }

    /// Returns `true` while the producer is running.
    pub fn is_active(&self) -> bool {
        lock(&self.shared.lifecycle).is_some()
    }

    /// Returns the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.state).listeners.len()
    }
}

impl<T> Observable<T> for Readable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Readable::subscribe(self, listener)
    }

    fn get(&self) -> T {
        Readable::get(self)
    }
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("Readable")
            .field("value", &state.value)
            .field("subscribers", &state.listeners.len())
            .finish()
    }
}
