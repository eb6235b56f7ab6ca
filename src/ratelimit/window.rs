//! Approximate sliding-window counter over a key-value store.
//!
//! Every call records one event in the bucket for the current second and
//! then sums the buckets of the trailing window. The store offers no atomic
//! increment, so the read-increment-write of the current bucket races with
//! other callers: two calls that read the same count in the same second both
//! write `count + 1` and one event is lost. Per-second buckets bound that
//! loss to calls landing in the same second for the same scope.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, trace};

use super::clock::{Clock, SystemClock};
use super::decision::RateLimitDecision;
use super::fallback::{FallbackPolicy, WarnSink};
use super::key::{build_key, window_keys};
use super::rules::WindowConfig;
use super::store::Store;
use crate::error::{KvLimitError, Result};

/// Records events and evaluates them against a sliding window.
///
/// Holds no per-scope state; the store is the only shared resource, so any
/// number of counters in any number of processes may share one store.
pub struct WindowCounter<S: Store + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    fallback: FallbackPolicy,
}

impl<S: Store + ?Sized> WindowCounter<S> {
    /// Create a counter on `store` using the system clock and `tracing`
    /// warnings.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            fallback: FallbackPolicy::default(),
        }
    }

    /// Use `clock` to pick the current bucket.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report store failures to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn WarnSink>) -> Self {
        self.fallback = FallbackPolicy::new(sink);
        self
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record one event for `scope` and decide whether it is within the limit.
    ///
    /// Never fails: store errors are reported to the warning sink and replaced
    /// with the fallback values, leaning towards allowing the event.
    #[instrument(
        skip(self, config),
        fields(window_sec = config.window_sec, limit = config.limit)
    )]
    pub async fn record_and_evaluate(&self, scope: &str, config: &WindowConfig) -> RateLimitDecision {
        let now_sec = self.clock.now_secs();
        let current_key = build_key(&config.bucket_key_prefix, scope, now_sec);

        let current = match self.store.get(&current_key).await {
            Ok(value) => parse_count(&current_key, value.as_deref()),
            Err(e) => self.fallback.current_read_failed(e),
        };
        let recorded = current.saturating_add(1);

        // The write must settle before the scan, which reads this bucket back.
        if let Err(e) = self
            .store
            .put(&current_key, &recorded.to_string(), config.bucket_ttl_secs())
            .await
        {
            self.fallback.current_write_failed(e);
        }

        let total = match self.scan(scope, now_sec, config).await {
            Ok(total) => total,
            Err(e) => self.fallback.window_scan_failed(e, recorded),
        };

        trace!(
            key = %current_key,
            recorded = recorded,
            total = total,
            "Evaluated sliding window"
        );

        let decision = RateLimitDecision::new(total, config.limit);
        if !decision.allowed {
            debug!(
                scope = %scope,
                total = total,
                limit = config.limit,
                "Rate limit exceeded"
            );
        }
        decision
    }

    /// Sum the window for `scope` without recording an event.
    ///
    /// Unlike `record_and_evaluate`, scan failures are returned to the caller.
    pub async fn window_total(&self, scope: &str, config: &WindowConfig) -> Result<u64> {
        self.scan(scope, self.clock.now_secs(), config).await
    }

    /// Read every bucket of the window concurrently and sum them.
    ///
    /// All reads settle before the results are inspected. If any read failed,
    /// the whole scan fails and carries the first error.
    async fn scan(&self, scope: &str, now_sec: u64, config: &WindowConfig) -> Result<u64> {
        let keys = window_keys(&config.bucket_key_prefix, scope, now_sec, config.scan_width());
        let results = join_all(keys.iter().map(|key| self.store.get(key))).await;

        let scanned = results.len();
        let mut total: u64 = 0;
        let mut failed = 0;
        let mut first_error: Option<KvLimitError> = None;

        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(value) => total = total.saturating_add(parse_count(key, value.as_deref())),
                Err(e) => {
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(total),
            Some(source) => Err(KvLimitError::ScanRead {
                failed,
                scanned,
                source: Box::new(source),
            }),
        }
    }
}

/// Parse a stored bucket count. Missing or malformed values count as zero.
fn parse_count(key: &str, value: Option<&str>) -> u64 {
    let Some(raw) = value else {
        return 0;
    };

    raw.trim().parse().unwrap_or_else(|_| {
        debug!(key = %key, value = %raw, "Ignoring unparseable bucket value");
        0
    })
}
