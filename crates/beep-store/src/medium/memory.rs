//! In-process medium.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::KvMedium;
use crate::{Error, Result, TRACING_TARGET_MEDIUM};

/// In-process medium with an optional byte quota.
///
/// The quota counts key and value lengths of every entry, so a write that
/// would grow the total past the limit fails with [`Error::QuotaExceeded`]
/// and leaves the previous value in place.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
}

/// Operation counters for a [`MemoryMedium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediumStats {
    pub reads: u64,
    pub writes: u64,
    pub removes: u64,
    pub entries: usize,
    pub used_bytes: usize,
}

impl MemoryMedium {
    /// Creates an unbounded medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a medium that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Returns the configured quota.
    #[inline]
    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }

    /// Returns operation counters and current usage.
    pub fn stats(&self) -> MediumStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        MediumStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            entries: entries.len(),
            used_bytes: used_bytes(&entries),
        }
    }
}

fn used_bytes(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KvMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(limit) = self.quota_bytes {
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let required = used_bytes(&entries) - replaced + key.len() + value.len();
            if required > limit {
                tracing::debug!(
                    target: TRACING_TARGET_MEDIUM,
                    key = %key,
                    required,
                    limit,
                    "Rejected write over quota"
                );
                return Err(Error::quota_exceeded(key, required, limit));
            }
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
