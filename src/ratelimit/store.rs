//! Key-value store contract consumed by the window counter.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for the key-value stores bucket counts live in.
///
/// The contract is deliberately weak: no atomic increment, no transactions,
/// and no read-after-write guarantee. Values are decimal strings and every
/// write carries its own time-to-live.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key does not exist or has expired.
    /// Backend failures are reported as `KvLimitError::StoreRead`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite `key` with `value`, expiring it after `ttl_secs` seconds.
    ///
    /// Backend failures are reported as `KvLimitError::StoreWrite`.
    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}
