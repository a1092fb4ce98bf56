#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for store operations.
///
/// Use this target for logging reads, writes, expiry decisions and absorbed failures.
pub const TRACING_TARGET_STORE: &str = "beep_store::store";

/// Tracing target for backing medium operations.
///
/// Use this target for logging medium I/O and quota decisions.
pub const TRACING_TARGET_MEDIUM: &str = "beep_store::medium";

/// Tracing target for reactive channel lifecycle.
///
/// Use this target for logging channel start/stop transitions and poller tasks.
pub const TRACING_TARGET_SIGNAL: &str = "beep_store::signal";

/// Tracing target for the clock ticker.
pub const TRACING_TARGET_TICKER: &str = "beep_store::ticker";

mod clock;
mod error;
pub mod medium;
pub mod prelude;
mod record;
pub mod signal;
pub mod store;
mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use record::StoredRecord;
pub use ticker::{ClockTicker, TickerOptions};
