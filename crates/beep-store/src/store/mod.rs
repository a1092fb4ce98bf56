//! Expiring local store.
//!
//! This module provides the single-key store and its configuration:
//! - `LocalStore<T>`: value, expiry and reactive channels for one key
//! - `StoreConfig`: key, time-to-live and expiry polling interval
//! - `SetOptions`: per-write expiry handling
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use beep_store::medium::{Backing, MemoryMedium};
//! use beep_store::store::{LocalStore, SetOptions};
//!
//! let store = LocalStore::create(
//!     Backing::new(MemoryMedium::new()),
//!     "visits",
//!     0_u32,
//!     Some(Duration::from_secs(60)),
//! );
//!
//! store.set(1);
//! store.update_with(|n| n + 1, SetOptions::preserve_expiry());
//! assert_eq!(store.get(), Some(2));
//!
//! store.delete();
//! assert_eq!(store.get(), None);
//! assert_eq!(store.value(), 0);
//! ```

mod config;
mod local_store;
mod options;
mod slot;

pub use config::StoreConfig;
pub use local_store::LocalStore;
pub use options::SetOptions;
