//! Store configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// Default values
const DEFAULT_KEY: &str = "beep";
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Configuration for a [`LocalStore`](super::LocalStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StoreConfig {
    /// Key identifying the record in the backing medium
    #[cfg_attr(
        feature = "config",
        arg(long = "store-key", env = "BEEP_STORE_KEY", default_value = DEFAULT_KEY)
    )]
    pub store_key: String,

    /// Time-to-live in milliseconds (unset or 0 = never expires)
    #[cfg_attr(
        feature = "config",
        arg(long = "store-ttl-ms", env = "BEEP_STORE_TTL_MS")
    )]
    pub store_ttl_ms: Option<u64>,

    /// Expiry polling interval in milliseconds while the expiry channel is observed
    #[cfg_attr(
        feature = "config",
        arg(long = "store-poll-interval-ms", env = "BEEP_STORE_POLL_INTERVAL_MS")
    )]
    pub store_poll_interval_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

impl StoreConfig {
    /// Create a configuration for `key` with no expiry.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            store_key: key.into(),
            store_ttl_ms: None,
            store_poll_interval_ms: None,
        }
    }

    /// Returns the record key.
    #[inline]
    pub fn key(&self) -> &str {
        &self.store_key
    }

    /// Returns the time-to-live, if expiry tracking is active.
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.store_ttl_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Returns the expiry polling interval, using the default if unset or zero.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        let ms = self
            .store_poll_interval_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    /// Set the record key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = key.into();
        self
    }

    /// Set the time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.store_ttl_ms = Some(duration_ms(ttl));
        self
    }

    /// Set the expiry polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.store_poll_interval_ms = Some(duration_ms(interval));
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<()> {
        if self.store_key.trim().is_empty() {
            return Err(Error::invalid_config("store key cannot be empty"));
        }

        if self.store_poll_interval_ms == Some(0) {
            return Err(Error::invalid_config(
                "store poll interval must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
