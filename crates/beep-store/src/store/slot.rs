//! Best-effort access to one record in the backing medium.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::medium::Backing;
use crate::record::{is_past, unpack_expiry};
use crate::{Clock, StoredRecord, TRACING_TARGET_STORE};

/// Outcome of reading the record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Load<T> {
    /// Unavailable medium, missing record, undecodable record or failed read.
    Absent,
    /// The record was past its expiry and has been erased.
    Expired,
    /// A live value.
    Live(T),
}

/// One key in a [`Backing`], with every failure absorbed and logged.
pub(crate) struct RecordSlot<T> {
    backing: Backing,
    key: Arc<str>,
    ttl_ms: Option<i64>,
    clock: Arc<dyn Clock>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordSlot<T> {
    fn clone(&self) -> Self {
        Self {
            backing: self.backing.clone(),
            key: Arc::clone(&self.key),
            ttl_ms: self.ttl_ms,
            clock: Arc::clone(&self.clock),
            _value: PhantomData,
        }
    }
}

impl<T> RecordSlot<T> {
    #[inline]
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn ttl_ms(&self) -> Option<i64> {
        self.ttl_ms
    }

    #[inline]
    pub(crate) fn is_available(&self) -> bool {
        self.backing.is_available()
    }

    /// Expiry is only observable with both a medium and a TTL.
    #[inline]
    pub(crate) fn tracks_expiry(&self) -> bool {
        self.is_available() && self.ttl_ms.is_some()
    }
}

impl<T> RecordSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(
        backing: Backing,
        key: impl Into<Arc<str>>,
        ttl_ms: Option<i64>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backing,
            key: key.into(),
            ttl_ms: ttl_ms.filter(|ms| *ms > 0),
            clock,
            _value: PhantomData,
        }
    }

    fn read_raw(&self) -> Option<String> {
        let medium = self.backing.medium()?;
        match medium.get_item(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    key = %self.key,
                    error = %e,
                    "Failed to read record, treating as absent"
                );
                None
            }
        }
    }

    /// Reads and decodes the record without any expiry handling.
    pub(crate) fn read(&self) -> Option<StoredRecord<T>> {
        let raw = self.read_raw()?;
        let record = StoredRecord::unpack(&raw);
        if record.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                key = %self.key,
                size_bytes = raw.len(),
                "Undecodable record, treating as absent"
            );
        }
        record
    }

    /// Reads the record, erasing it if it has expired.
    pub(crate) fn load(&self) -> Load<T> {
        let Some(record) = self.read() else {
            return Load::Absent;
        };

        if record.is_expired(self.clock.now_ms()) {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                key = %self.key,
                expires_at = record.expires_at,
                "Record expired, removing"
            );
            self.remove();
            return Load::Expired;
        }

        Load::Live(record.value)
    }

    /// Checks the stored expiry without decoding the payload.
    pub(crate) fn is_expired(&self) -> bool {
        if !self.tracks_expiry() {
            return false;
        }

        self.read_raw()
            .and_then(|raw| unpack_expiry(&raw))
            .is_some_and(|expires_at| is_past(expires_at, self.clock.now_ms()))
    }

    /// Expiry for a record written now.
    pub(crate) fn fresh_expiry(&self) -> Option<i64> {
        self.ttl_ms
            .map(|ttl| self.clock.now_ms().saturating_add(ttl))
    }

    /// Persists `value`, refreshing or preserving the expiry.
    pub(crate) fn write(&self, value: &T, preserve_expiry: bool) {
        if !self.is_available() {
            return;
        }

        let expires_at = match self.ttl_ms {
            None => None,
            Some(_) if preserve_expiry => self
                .read_raw()
                .and_then(|raw| unpack_expiry(&raw))
                .flatten()
                .or_else(|| self.fresh_expiry()),
            Some(_) => self.fresh_expiry(),
        };

        self.put(value, expires_at);
    }

    fn put(&self, value: &T, expires_at: Option<i64>) {
        let Some(medium) = self.backing.medium() else {
            return;
        };

        let packed = match StoredRecord::new(value, expires_at).pack() {
            Ok(packed) => packed,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    key = %self.key,
                    error = %e,
                    "Failed to encode record, keeping in-memory value only"
                );
                return;
            }
        };

        match medium.set_item(&self.key, &packed) {
            Ok(()) => tracing::debug!(
                target: TRACING_TARGET_STORE,
                key = %self.key,
                expires_at,
                size_bytes = packed.len(),
                "Persisted record"
            ),
            Err(e) => tracing::warn!(
                target: TRACING_TARGET_STORE,
                key = %self.key,
                error = %e,
                quota_exceeded = e.is_quota_exceeded(),
                "Failed to persist record, keeping in-memory value only"
            ),
        }
    }

    /// Best-effort removal.
    pub(crate) fn remove(&self) {
        let Some(medium) = self.backing.medium() else {
            return;
        };

        if let Err(e) = medium.remove_item(&self.key) {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                key = %self.key,
                error = %e,
                "Failed to remove record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use crate::medium::{KvMedium, MemoryMedium};

    fn slot(ttl_ms: Option<i64>) -> (RecordSlot<u32>, Arc<MemoryMedium>, ManualClock) {
        let medium = Arc::new(MemoryMedium::new());
        let clock = ManualClock::new(10_000);
        let slot = RecordSlot::new(
            Backing::new(Arc::clone(&medium)),
            "counter",
            ttl_ms,
            Arc::new(clock.clone()),
        );
        (slot, medium, clock)
    }

    #[test]
    fn test_write_without_ttl_has_no_expiry() {
        let (slot, medium, _) = slot(None);
        slot.write(&3, false);
        assert_eq!(
            medium.get_item("counter").unwrap().as_deref(),
            Some(r#"{"v":3,"e":null}"#)
        );
    }

    #[test]
    fn test_preserve_reuses_stored_expiry() {
        let (slot, _, clock) = slot(Some(1_000));
        slot.write(&1, false);
        assert_eq!(slot.read().unwrap().expires_at, Some(11_000));

        clock.advance(std::time::Duration::from_millis(400));
        slot.write(&2, true);
        assert_eq!(slot.read().unwrap(), StoredRecord::new(2, Some(11_000)));

        slot.write(&3, false);
        assert_eq!(slot.read().unwrap().expires_at, Some(11_400));
    }

    #[test]
    fn test_preserve_without_record_computes_fresh() {
        let (slot, _, _) = slot(Some(500));
        slot.write(&1, true);
        assert_eq!(slot.read().unwrap().expires_at, Some(10_500));
    }

    #[test]
    fn test_load_erases_expired_record() {
        let (slot, medium, clock) = slot(Some(100));
        slot.write(&9, false);
        assert_eq!(slot.load(), Load::Live(9));

        clock.advance(std::time::Duration::from_millis(101));
        assert!(slot.is_expired());
        assert_eq!(slot.load(), Load::Expired);
        assert_eq!(medium.get_item("counter").unwrap(), None);
        assert_eq!(slot.load(), Load::Absent);
    }

    #[test]
    fn test_is_expired_ignores_payload_type() {
        let (slot, medium, clock) = slot(Some(100));
        medium
            .set_item("counter", r#"{"v":"not a number","e":10050}"#)
            .unwrap();

        assert_eq!(slot.load(), Load::Absent);
        clock.advance(std::time::Duration::from_millis(51));
        assert!(slot.is_expired());
    }

    #[test]
    fn test_unavailable_backing_is_inert() {
        let slot: RecordSlot<u32> = RecordSlot::new(
            Backing::Unavailable,
            "counter",
            Some(100),
            Arc::new(ManualClock::new(0)),
        );
        slot.write(&1, false);
        slot.remove();
        assert_eq!(slot.load(), Load::Absent);
        assert!(!slot.is_expired());
        assert!(!slot.tracks_expiry());
    }
}
