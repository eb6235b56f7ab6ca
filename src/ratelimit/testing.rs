//! Store and sink doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::clock::Clock;
use super::fallback::{FallbackEvent, WarnSink};
use super::memory::MemoryStore;
use super::store::Store;
use crate::error::{KvLimitError, Result};

/// A store whose reads and writes can be made to fail per key.
#[derive(Default)]
pub struct FaultyStore {
    data: Mutex<HashMap<String, String>>,
    failing_gets: Mutex<HashSet<String>>,
    fail_once: Mutex<HashSet<String>>,
    fail_all_gets: AtomicBool,
    fail_puts: AtomicBool,
    get_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.data.lock().insert(key.to_string(), value.to_string());
    }

    /// Every read of `key` fails.
    pub fn fail_gets_for(&self, key: &str) {
        self.failing_gets.lock().insert(key.to_string());
    }

    /// Only the next read of `key` fails.
    pub fn fail_next_get(&self, key: &str) {
        self.fail_once.lock().insert(key.to_string());
    }

    pub fn fail_all_gets(&self, fail: bool) {
        self.fail_all_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all_gets.load(Ordering::SeqCst)
            || self.failing_gets.lock().contains(key)
            || self.fail_once.lock().remove(key)
        {
            return Err(KvLimitError::store_read(key, "injected read failure"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(KvLimitError::store_write(key, "injected write failure"));
        }
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store that answers reads with the value seen at call time, after a delay.
///
/// Snapshotting before the delay makes concurrent read-modify-write races
/// deterministic under a paused tokio clock.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            inner: MemoryStore::with_clock(clock),
            delay,
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl Store for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let snapshot = self.inner.get(key).await?;
        tokio::time::sleep(self.delay).await;
        Ok(snapshot)
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.inner.put(key, value, ttl_secs).await
    }
}

/// Collects fallback reports in order.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(FallbackEvent, String)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<FallbackEvent> {
        self.reports.lock().iter().map(|(event, _)| *event).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(_, msg)| msg.clone()).collect()
    }
}

impl WarnSink for RecordingSink {
    fn warn(&self, event: FallbackEvent, error: &KvLimitError) {
        self.reports.lock().push((event, error.to_string()));
    }
}
