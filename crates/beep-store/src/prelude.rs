//! Prelude module for beep-store.
//!
//! This module re-exports the most commonly used types and traits from beep-store,
//! making it easy to import everything you need with a single `use` statement.
//!
//! # Example
//!
//! ```rust
//! use beep_store::prelude::*;
//!
//! let store = LocalStore::create(Backing::Unavailable, "draft", String::new(), None);
//! store.set("hello".to_owned());
//! assert_eq!(store.value(), "hello");
//! ```

// Media
pub use crate::medium::{Backing, FileMedium, KvMedium, MemoryMedium};
// Reactive channels
pub use crate::signal::{Observable, Readable, Setter, StopHandle, Subscription, Writable};
// Store types
pub use crate::store::{LocalStore, SetOptions, StoreConfig};
// Clocks and ticker
pub use crate::{Clock, ClockTicker, ManualClock, SystemClock, TickerOptions};
// Error types
pub use crate::{Error, Result};
