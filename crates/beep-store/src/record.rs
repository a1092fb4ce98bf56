//! Serialized record layout.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A value together with its optional absolute expiry.
///
/// Encoded as `{"v": <value>, "e": <epoch ms or null>}`. A missing `"e"`
/// decodes as "never expires".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    /// Stored payload.
    #[serde(rename = "v")]
    pub value: T,

    /// Absolute expiry instant in epoch milliseconds.
    #[serde(rename = "e", default)]
    pub expires_at: Option<i64>,
}

impl<T> StoredRecord<T> {
    /// Creates a record.
    pub fn new(value: T, expires_at: Option<i64>) -> Self {
        Self { value, expires_at }
    }

    /// Returns `true` once `now_ms` is strictly past the expiry.
    #[inline]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        is_past(self.expires_at, now_ms)
    }
}

impl<T: Serialize> StoredRecord<T> {
    /// Encodes the record as a JSON string.
    pub fn pack(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> StoredRecord<T> {
    /// Decodes a record. Any decode failure reads as "no record".
    pub fn unpack(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Reads only the expiry of a record, ignoring the payload type.
///
/// Returns `None` when `raw` is not a record at all.
pub(crate) fn unpack_expiry(raw: &str) -> Option<Option<i64>> {
    StoredRecord::<IgnoredAny>::unpack(raw).map(|record| record.expires_at)
}

#[inline]
pub(crate) fn is_past(expires_at: Option<i64>, now_ms: i64) -> bool {
    matches!(expires_at, Some(at) if now_ms > at)
}
