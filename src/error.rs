//! Error types for kvlimit.

use thiserror::Error;

/// Boxed error produced by a store backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for kvlimit operations.
#[derive(Error, Debug)]
pub enum KvLimitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single-key read from the store failed
    #[error("Store read failed for key {key}: {source}")]
    StoreRead {
        key: String,
        #[source]
        source: BoxError,
    },

    /// A write to the store failed
    #[error("Store write failed for key {key}: {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: BoxError,
    },

    /// One or more reads of the window scan failed
    #[error("Window scan failed: {failed} of {scanned} bucket reads errored")]
    ScanRead {
        failed: usize,
        scanned: usize,
        #[source]
        source: Box<KvLimitError>,
    },

    /// A store adapter could not reach its backend
    #[error("Store connection error: {0}")]
    Connection(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KvLimitError {
    /// Wrap a backend error raised while reading `key`.
    pub fn store_read(key: &str, source: impl Into<BoxError>) -> Self {
        KvLimitError::StoreRead {
            key: key.to_string(),
            source: source.into(),
        }
    }

    /// Wrap a backend error raised while writing `key`.
    pub fn store_write(key: &str, source: impl Into<BoxError>) -> Self {
        KvLimitError::StoreWrite {
            key: key.to_string(),
            source: source.into(),
        }
    }
}

impl From<config::ConfigError> for KvLimitError {
    fn from(err: config::ConfigError) -> Self {
        KvLimitError::Config(err.to_string())
    }
}

/// Result type alias for kvlimit operations.
pub type Result<T> = std::result::Result<T, KvLimitError>;
