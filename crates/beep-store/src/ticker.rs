//! Periodically formatted wall-clock time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jiff::Timestamp;
use jiff::fmt::strtime;
use jiff::tz::TimeZone;

use crate::signal::{Observable, Readable, Setter, Subscription, poll_every};
use crate::{Clock, Error, Result, SystemClock, TRACING_TARGET_TICKER};

// Default values
const DEFAULT_INTERVAL_MS: u64 = 500;
/// `Oct 19, 2026, 03:04:05 PM`
const DEFAULT_FORMAT: &str = "%b %-d, %Y, %I:%M:%S %p";

/// Options for a [`ClockTicker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerOptions {
    /// Time between updates while observed.
    pub interval: Duration,
    /// `strftime`-style pattern.
    pub format: String,
    /// IANA time zone name; the system zone when unset.
    pub time_zone: Option<String>,
}

impl Default for TickerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            format: DEFAULT_FORMAT.to_owned(),
            time_zone: None,
        }
    }
}

impl TickerOptions {
    /// Set the update interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the format pattern.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the time zone.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Validates the options and resolves the time zone.
    pub fn validate(&self) -> Result<TimeZone> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("ticker interval must be greater than zero"));
        }

        let tz = match self.time_zone.as_deref() {
            None => TimeZone::system(),
            Some(name) if name.eq_ignore_ascii_case("UTC") => TimeZone::UTC,
            Some(name) => TimeZone::get(name).map_err(|e| {
                Error::invalid_config(format!("unknown time zone '{name}': {e}"))
            })?,
        };

        strtime::format(&self.format, &Timestamp::UNIX_EPOCH.to_zoned(tz.clone())).map_err(
            |e| Error::invalid_config(format!("invalid time format '{}': {e}", self.format)),
        )?;

        Ok(tz)
    }
}

#[derive(Clone)]
struct Formatter {
    format: Arc<str>,
    tz: TimeZone,
    clock: Arc<dyn Clock>,
}

impl Formatter {
    fn now(&self) -> String {
        let zoned = self.clock.now().to_zoned(self.tz.clone());
        strtime::format(self.format.as_bytes(), &zoned).unwrap_or_else(|e| {
            tracing::warn!(target: TRACING_TARGET_TICKER, error = %e, "Failed to format time");
            zoned.to_string()
        })
    }
}

/// Channel publishing the current time as a formatted string.
///
/// Formats once on construction and, while observed, immediately on the
/// first subscription and then every interval.
#[derive(Clone)]
pub struct ClockTicker {
    readable: Readable<String>,
    ticking: Arc<AtomicBool>,
    interval: Duration,
}

impl ClockTicker {
    /// Creates a ticker using the system clock.
    pub fn new(options: TickerOptions) -> Result<Self> {
        Self::with_clock(options, SystemClock)
    }

    /// Creates a ticker reading time from `clock`.
    pub fn with_clock(options: TickerOptions, clock: impl Clock) -> Result<Self> {
        let tz = options.validate()?;
        let formatter = Formatter {
            format: Arc::from(options.format.as_str()),
            tz,
            clock: Arc::new(clock),
        };

        let ticking = Arc::new(AtomicBool::new(false));
        let interval = options.interval;
        let initial = formatter.now();

        let running = Arc::clone(&ticking);
        let readable = Readable::new(initial, move |setter: Setter<String>| {
            setter.set(formatter.now());
            let formatter = formatter.clone();
            poll_every(interval, &running, "clock", move || {
                setter.set(formatter.now())
            })
        });

        tracing::debug!(
            target: TRACING_TARGET_TICKER,
            interval_ms = interval.as_millis() as u64,
            format = %options.format,
            time_zone = ?options.time_zone,
            "Created clock ticker"
        );

        Ok(Self {
            readable,
            ticking,
            interval,
        })
    }

    /// Subscribes to the formatted time.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.readable.subscribe(listener)
    }

    /// Returns the last formatted time.
    pub fn get(&self) -> String {
        self.readable.get()
    }

    /// Returns the update interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` while the ticker task is running.
    #[inline]
    pub fn is_ticking(&self) -> bool {
        self.ticking.load(Ordering::SeqCst)
    }
}

impl Observable<String> for ClockTicker {
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        ClockTicker::subscribe(self, listener)
    }

    fn get(&self) -> String {
        ClockTicker::get(self)
    }
}
