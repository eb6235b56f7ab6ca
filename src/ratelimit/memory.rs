//! In-process TTL store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::clock::{Clock, SystemClock};
use super::store::Store;
use crate::error::Result;

/// Minimum time between two expiry sweeps triggered by writes.
const SWEEP_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at_ms: u64,
}

/// A `Store` that keeps buckets in a concurrent map.
///
/// An expired entry is dropped when it is next read, and writes sweep the
/// whole map at most once per second, so buckets that leave the window and
/// are never read again are still reclaimed. Useful for tests and
/// single-process deployments where no shared store exists.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    next_sweep_ms: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store that expires entries against the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that expires entries against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            next_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now_millis())
    }

    fn purge_expired_at(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at_ms > now);
        let removed = before.saturating_sub(self.entries.len());

        trace!(removed = removed, "Purged expired buckets");
        removed
    }

    /// Sweep expired entries if the sweep deadline has passed.
    ///
    /// Only the caller that wins the deadline update sweeps.
    fn maybe_sweep(&self, now: u64) {
        let due = self.next_sweep_ms.load(Ordering::Acquire);
        if now < due {
            return;
        }
        let next = now.saturating_add(SWEEP_INTERVAL_MS);
        if self
            .next_sweep_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_expired_at(now);
        }
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now_millis();

        match self.entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        self.entries.remove_if(key, |_, entry| entry.expires_at_ms <= now);
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let now = self.clock.now_millis();
        self.maybe_sweep(now);

        let expires_at_ms = now.saturating_add(ttl_secs.saturating_mul(1000));

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }
}
