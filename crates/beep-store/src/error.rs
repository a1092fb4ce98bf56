//! Error types and utilities for store operations.

/// Result type for all fallible operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
/// Media, configuration validation and the clock ticker return this type;
/// [`LocalStore`](crate::store::LocalStore) absorbs it.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem errors from directory-backed media
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors when encoding or decoding records
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Write rejected because the medium quota would be exceeded
    #[error("Quota exceeded writing '{key}': {required} bytes required, {limit} bytes allowed")]
    QuotaExceeded {
        key: String,
        required: usize,
        limit: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a quota exceeded error
    pub fn quota_exceeded(key: impl Into<String>, required: usize, limit: usize) -> Self {
        Self::QuotaExceeded {
            key: key.into(),
            required,
            limit,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the medium refused to hold more data.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
