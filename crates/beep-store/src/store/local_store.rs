//! Expiring single-key store.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::slot::{Load, RecordSlot};
use super::{SetOptions, StoreConfig};
use crate::medium::Backing;
use crate::signal::{Observable, Readable, Setter, StopHandle, Subscription, Writable, poll_every};
use crate::{Clock, SystemClock, TRACING_TARGET_STORE};

/// One key in a backing medium, with an optional time-to-live and reactive
/// views of its value and expiry.
///
/// The store never fails: an unavailable medium, an undecodable record or a
/// rejected write all degrade to the in-memory value, and [`get`](Self::get)
/// returning `None` is the only signal of absence, expiry or failure.
///
/// Clones share the same channels and record.
pub struct LocalStore<T> {
    slot: RecordSlot<T>,
    initial: T,
    value: Writable<T>,
    expired: Readable<bool>,
    polling: Arc<AtomicBool>,
}

impl<T> LocalStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a store for `key`, expiring `ttl` after each write when set.
    pub fn create(
        backing: Backing,
        key: impl Into<String>,
        initial: T,
        ttl: Option<Duration>,
    ) -> Self {
        let mut config = StoreConfig::new(key);
        if let Some(ttl) = ttl {
            config = config.with_ttl(ttl);
        }
        Self::from_config(backing, &config, initial)
    }

    /// Creates a store from configuration using the system clock.
    pub fn from_config(backing: Backing, config: &StoreConfig, initial: T) -> Self {
        Self::with_clock(backing, config, initial, SystemClock)
    }

    /// Creates a store from configuration with an explicit clock.
    ///
    /// Reads the medium once: a live record seeds the value, an expired one
    /// is erased and raises the initial expiry flag. When no live record
    /// remains, one is written with the starting value and a fresh expiry.
    #[tracing::instrument(
        skip_all,
        fields(key = %config.key(), ttl_ms = config.store_ttl_ms),
        target = TRACING_TARGET_STORE
    )]
    pub fn with_clock(
        backing: Backing,
        config: &StoreConfig,
        initial: T,
        clock: impl Clock,
    ) -> Self {
        let ttl_ms = config
            .ttl()
            .map(|ttl| i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        let slot = RecordSlot::new(backing, config.key(), ttl_ms, Arc::new(clock));

        let (start_value, start_expired, seed) = match slot.load() {
            Load::Live(value) => (value, false, false),
            Load::Expired => (initial.clone(), true, true),
            Load::Absent => (initial.clone(), false, true),
        };

        if seed {
            slot.write(&start_value, false);
        }

        let polling = Arc::new(AtomicBool::new(false));
        let expired = expiry_channel(slot.clone(), start_expired, config.poll_interval(), &polling);

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            key = %slot.key(),
            persistent = slot.is_available(),
            restored = !seed,
            expired = start_expired,
            "Created local store"
        );

        Self {
            slot,
            initial,
            value: Writable::new(start_value),
            expired,
            polling,
        }
    }

    /// Reads the medium afresh.
    ///
    /// Returns `None` when the medium is unavailable, the record is missing
    /// or undecodable, or the record has expired, in which case it is also
    /// erased. The reactive value is not touched.
    pub fn get(&self) -> Option<T> {
        match self.slot.load() {
            Load::Live(value) => Some(value),
            Load::Absent | Load::Expired => None,
        }
    }

    /// Sets the value with a fresh expiry.
    pub fn set(&self, value: T) {
        self.set_with(value, SetOptions::default());
    }

    /// Publishes `value` to subscribers, then persists it.
    pub fn set_with(&self, value: T, options: SetOptions) {
        self.value.set(value.clone());
        self.slot.write(&value, options.preserve_expiry);
    }

    /// Applies `updater` to the current reactive value and sets the result.
    pub fn update(&self, updater: impl FnOnce(T) -> T) {
        self.update_with(updater, SetOptions::default());
    }

    /// Like [`update`](Self::update), forwarding `options` to
    /// [`set_with`](Self::set_with).
    pub fn update_with(&self, updater: impl FnOnce(T) -> T, options: SetOptions) {
        let next = updater(self.value.get());
        self.set_with(next, options);
    }

    /// Removes the record and resets the reactive value to the initial value.
    pub fn delete(&self) {
        self.slot.remove();
        tracing::debug!(target: TRACING_TARGET_STORE, key = %self.slot.key(), "Deleted record");
        self.value.set(self.initial.clone());
    }

    /// Checks the stored record's expiry now.
    ///
    /// Always `false` without a medium or without a TTL.
    pub fn is_expired(&self) -> bool {
        self.slot.is_expired()
    }

    /// Subscribes to the reactive value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.value.subscribe(listener)
    }

    /// Channel reporting whether the stored record has expired.
    ///
    /// Polls the medium while it has subscribers.
    #[inline]
    pub fn expired(&self) -> &Readable<bool> {
        &self.expired
    }

    /// Returns the current reactive value.
    #[inline]
    pub fn value(&self) -> T {
        self.value.get()
    }

    /// Returns the value the store resets to on [`delete`](Self::delete).
    #[inline]
    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Returns the record key.
    #[inline]
    pub fn key(&self) -> &str {
        self.slot.key()
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.slot
            .ttl_ms()
            .map(|ms| Duration::from_millis(ms.unsigned_abs()))
    }

    /// Returns `true` when writes reach a backing medium.
    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.slot.is_available()
    }

    /// Returns `true` while an expiry poller is running.
    #[inline]
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }
}

fn expiry_channel<T>(
    slot: RecordSlot<T>,
    start_expired: bool,
    interval: Duration,
    polling: &Arc<AtomicBool>,
) -> Readable<bool>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let polling = Arc::clone(polling);
    Readable::new(start_expired, move |setter: Setter<bool>| {
        if !slot.tracks_expiry() {
            setter.set(false);
            return StopHandle::noop();
        }

        setter.set(slot.is_expired());
        let slot = slot.clone();
        poll_every(interval, &polling, "expiry", move || {
            setter.set(slot.is_expired())
        })
    })
}

impl<T> Observable<T> for LocalStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        LocalStore::subscribe(self, listener)
    }

    fn get(&self) -> T {
        self.value()
    }
}

impl<T: Clone> Clone for LocalStore<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            initial: self.initial.clone(),
            value: self.value.clone(),
            expired: self.expired.clone(),
            polling: Arc::clone(&self.polling),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("key", &self.slot.key())
            .field("ttl_ms", &self.slot.ttl_ms())
            .field("persistent", &self.slot.is_available())
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde::Deserialize;

    use super::*;
    use crate::medium::{KvMedium, MemoryMedium};
    use crate::{ManualClock, StoredRecord};

    const T0: i64 = 1_700_000_000_000;

    struct Fixture {
        medium: Arc<MemoryMedium>,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                medium: Arc::new(MemoryMedium::new()),
                clock: ManualClock::new(T0),
            }
        }

        fn store<T>(&self, key: &str, initial: T, ttl_ms: Option<u64>) -> LocalStore<T>
        where
            T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        {
            let mut config = StoreConfig::new(key);
            if let Some(ms) = ttl_ms {
                config = config.with_ttl(Duration::from_millis(ms));
            }
            LocalStore::with_clock(
                Backing::new(Arc::clone(&self.medium)),
                &config,
                initial,
                self.clock.clone(),
            )
        }

        fn raw(&self, key: &str) -> Option<String> {
            self.medium.get_item(key).unwrap()
        }

        fn advance_ms(&self, ms: u64) {
            self.clock.advance(Duration::from_millis(ms));
        }
    }

    fn record<T: Clone + Send + 'static>(
        seen: &Arc<Mutex<Vec<T>>>,
    ) -> impl Fn(&T) + Send + Sync + 'static {
        let sink = Arc::clone(seen);
        move |v: &T| sink.lock().unwrap().push(v.clone())
    }

    #[test]
    fn test_set_then_get_without_ttl() {
        let fx = Fixture::new();
        let store = fx.store("name", String::new(), None);

        store.set("beep".to_string());
        assert_eq!(store.get().as_deref(), Some("beep"));

        fx.advance_ms(365 * 24 * 60 * 60 * 1_000);
        assert_eq!(store.get().as_deref(), Some("beep"));
        assert!(!store.is_expired());
    }

    #[test]
    fn test_get_after_ttl_returns_none_and_erases() {
        let fx = Fixture::new();
        let store = fx.store("k", 0_i64, Some(1_000));

        store.set(5);
        assert_eq!(store.get(), Some(5));

        fx.advance_ms(1_000);
        assert_eq!(store.get(), Some(5));

        fx.advance_ms(1);
        assert!(store.is_expired());
        assert_eq!(store.get(), None);
        assert_eq!(fx.raw("k"), None);
        assert!(!store.is_expired());
        assert_eq!(store.value(), 5);
    }

    #[test]
    fn test_construction_seeds_record() {
        let fx = Fixture::new();
        let store = fx.store("seeded", vec![1, 2], Some(500));

        assert_eq!(fx.raw("seeded").as_deref(), Some(r#"{"v":[1,2],"e":1700000000500}"#));
        assert_eq!(store.get(), Some(vec![1, 2]));
        assert!(!store.expired().get());
    }

    #[test]
    fn test_construction_restores_live_record() {
        let fx = Fixture::new();
        fx.medium
            .set_item("theme", r#"{"v":"dark","e":null}"#)
            .unwrap();

        let store = fx.store("theme", "light".to_string(), None);
        assert_eq!(store.value(), "dark");
        assert_eq!(fx.raw("theme").as_deref(), Some(r#"{"v":"dark","e":null}"#));

        let debug = format!("{store:?}");
        assert!(debug.starts_with("LocalStore"));
        assert!(debug.contains(r#"key: "theme""#));
        assert!(debug.contains("ttl_ms: None"));
        assert!(debug.contains("persistent: true"));
    }

    #[test]
    fn test_construction_over_expired_record() {
        let fx = Fixture::new();
        let stale = format!(r#"{{"v":42,"e":{}}}"#, T0 - 1);
        fx.medium.set_item("n", &stale).unwrap();

        let store = fx.store("n", 7_u32, Some(200));
        assert_eq!(store.value(), 7);
        assert!(store.expired().get());
        assert!(!store.is_expired());
        assert_eq!(store.get(), Some(7));
    }

    #[test]
    fn test_construction_overwrites_undecodable_record() {
        let fx = Fixture::new();
        fx.medium.set_item("n", "{not json").unwrap();

        let store = fx.store("n", 1_u8, None);
        assert_eq!(store.get(), Some(1));
    }

    #[test]
    fn test_preserve_expiry() {
        let fx = Fixture::new();
        let store = fx.store("p", 0_u32, Some(1_000));
        let stored_expiry = |fx: &Fixture| {
            StoredRecord::<u32>::unpack(&fx.raw("p").unwrap())
                .unwrap()
                .expires_at
        };
        assert_eq!(stored_expiry(&fx), Some(T0 + 1_000));

        fx.advance_ms(600);
        store.set_with(1, SetOptions::preserve_expiry());
        assert_eq!(stored_expiry(&fx), Some(T0 + 1_000));

        store.set(2);
        assert_eq!(stored_expiry(&fx), Some(T0 + 1_600));

        fx.advance_ms(100);
        store.update_with(|v| v + 1, SetOptions::preserve_expiry());
        assert_eq!(stored_expiry(&fx), Some(T0 + 1_600));
        assert_eq!(store.get(), Some(3));
    }

    #[test]
    fn test_update_matches_set_of_current() {
        let fx = Fixture::new();
        let a = fx.store("a", 10_i32, Some(100));
        let b = fx.store("b", 10_i32, Some(100));

        a.update(|v| v * 3);
        let current = b.value();
        b.set(current * 3);

        assert_eq!(a.value(), b.value());
        assert_eq!(a.get(), b.get());
    }

    #[test]
    fn test_delete_resets_value() {
        let fx = Fixture::new();
        let store = fx.store("d", "init".to_string(), Some(1_000));
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let _sub = store.subscribe(record(&seen));

        store.set("changed".to_string());
        store.delete();

        assert_eq!(store.get(), None);
        assert_eq!(fx.raw("d"), None);
        assert_eq!(store.value(), "init");
        assert_eq!(*seen.lock().unwrap(), vec!["init", "changed", "init"]);
    }

    #[test]
    fn test_subscribers_see_calls_in_order() {
        let fx = Fixture::new();
        let store = fx.store("o", 0_u32, None);
        let seen = Arc::new(Mutex::new(Vec::<u32>::new()));
        let _sub = store.subscribe(record(&seen));

        store.set(1);
        store.update(|v| v + 10);
        store.set(1);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 11, 1]);
    }

    #[test]
    fn test_unavailable_medium_keeps_memory_value() {
        let store = LocalStore::create(Backing::Unavailable, "k", "x".to_string(), None);
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let _sub = store.subscribe(record(&seen));

        store.set("y".to_string());
        assert_eq!(store.get(), None);
        assert_eq!(store.value(), "y");
        assert!(!store.is_expired());
        assert!(!store.is_persistent());
        assert_eq!(*seen.lock().unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_quota_failure_is_absorbed() {
        let medium = Arc::new(MemoryMedium::with_quota(32));
        let store = LocalStore::create(
            Backing::new(Arc::clone(&medium)),
            "big",
            String::new(),
            None,
        );
        assert_eq!(store.get().as_deref(), Some(""));

        store.set("x".repeat(64));
        assert_eq!(store.value().len(), 64);
        assert_eq!(store.get().as_deref(), Some(""));
    }

    #[test]
    fn test_unserializable_value_is_absorbed() {
        #[derive(Clone, Deserialize)]
        struct Opaque;

        impl Serialize for Opaque {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("opaque"))
            }
        }

        let fx = Fixture::new();
        let store = fx.store("opaque", Opaque, None);
        store.set(Opaque);
        assert_eq!(fx.raw("opaque"), None);
    }

    #[test]
    fn test_expired_channel_without_ttl_reports_false() {
        let fx = Fixture::new();
        let store = fx.store("plain", 0_u8, None);
        let seen = Arc::new(Mutex::new(Vec::<bool>::new()));
        let _sub = store.expired().subscribe(record(&seen));

        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert!(!store.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_channel_polls_while_observed() {
        let fx = Fixture::new();
        let config = StoreConfig::new("ttl")
            .with_ttl(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(250));
        let store = LocalStore::with_clock(
            Backing::new(Arc::clone(&fx.medium)),
            &config,
            0_u32,
            fx.clock.clone(),
        );

        let seen = Arc::new(Mutex::new(Vec::<bool>::new()));
        let sub = store.expired().subscribe(record(&seen));
        assert!(store.is_polling());
        assert_eq!(*seen.lock().unwrap(), vec![false]);

        fx.advance_ms(101);
        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);

        sub.unsubscribe();
        assert!(!store.is_polling());
        assert!(!store.expired().is_active());

        let reads = fx.medium.stats().reads;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fx.medium.stats().reads, reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_channel_clears_after_set() {
        let fx = Fixture::new();
        let store = fx.store("again", 0_u32, Some(100));
        let seen = Arc::new(Mutex::new(Vec::<bool>::new()));
        let _sub = store.expired().subscribe(record(&seen));

        fx.advance_ms(150);
        tokio::time::sleep(Duration::from_millis(260)).await;
        store.set(1);
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }
}
