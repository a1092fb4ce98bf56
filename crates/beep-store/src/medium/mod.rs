//! Backing media for persisted records.
//!
//! This module provides the synchronous string-keyed interface a store
//! persists through:
//! - `KvMedium`: get/set/remove contract implemented by every medium
//! - `Backing`: an available medium, or the explicit `Unavailable` variant
//! - `MemoryMedium`: in-process map with an optional byte quota
//! - `FileMedium`: one file per key inside a directory
//!
//! # Example
//!
//! ```
//! use beep_store::medium::{Backing, KvMedium, MemoryMedium};
//!
//! let medium = MemoryMedium::new();
//! medium.set_item("theme", r#"{"v":"dark","e":null}"#).unwrap();
//!
//! let backing = Backing::new(medium);
//! assert!(backing.is_available());
//! assert!(!Backing::Unavailable.is_available());
//! ```

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;

pub use file::FileMedium;
pub use memory::{MediumStats, MemoryMedium};

use crate::Result;

/// Synchronous string-keyed key-value medium.
///
/// Implementations report failures through [`Result`]; the store decides
/// which failures to absorb.
pub trait KvMedium: Send + Sync + 'static {
    /// Reads the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<M: KvMedium> KvMedium for Arc<M> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Where a store persists its record.
#[derive(Clone, Default)]
pub enum Backing {
    /// No medium in this context; stores hold their value in memory only.
    #[default]
    Unavailable,
    /// A shared medium.
    Available(Arc<dyn KvMedium>),
}

impl Backing {
    /// Wraps a medium.
    pub fn new(medium: impl KvMedium) -> Self {
        Self::Available(Arc::new(medium))
    }

    /// Wraps an already shared medium.
    pub fn shared(medium: Arc<dyn KvMedium>) -> Self {
        Self::Available(medium)
    }

    /// Returns `true` if a medium is attached.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Returns the attached medium.
    #[inline]
    pub fn medium(&self) -> Option<&dyn KvMedium> {
        match self {
            Self::Available(medium) => Some(medium.as_ref()),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("Backing::Unavailable"),
            Self::Available(_) => f.write_str("Backing::Available(..)"),
        }
    }
}
