//! Substitute values for failed store operations.
//!
//! A rate limiter must not become a hard dependency of the traffic it shapes,
//! so no store failure is surfaced to the caller. Each failure is reported to
//! a [`WarnSink`] and replaced as follows:
//!
//! | Failure                         | Substitute                          |
//! |---------------------------------|-------------------------------------|
//! | read of the current bucket      | `0` (fail-open)                     |
//! | write of the incremented bucket | keep the in-memory value            |
//! | any read of the window scan     | total is the current bucket alone   |

use std::sync::Arc;

use tracing::warn;

use crate::error::KvLimitError;

/// The store operation a fallback was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackEvent {
    /// Reading the current second's bucket failed
    CurrentBucketRead,
    /// Writing the incremented bucket back failed
    CurrentBucketWrite,
    /// At least one read of the window scan failed
    WindowScan,
}

impl FallbackEvent {
    /// Stable name used as a log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackEvent::CurrentBucketRead => "current_bucket_read",
            FallbackEvent::CurrentBucketWrite => "current_bucket_write",
            FallbackEvent::WindowScan => "window_scan",
        }
    }
}

impl std::fmt::Display for FallbackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives a report for every store failure the limiter recovers from.
pub trait WarnSink: Send + Sync {
    fn warn(&self, event: FallbackEvent, error: &KvLimitError);
}

/// Forwards fallback reports to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarnSink for TracingSink {
    fn warn(&self, event: FallbackEvent, error: &KvLimitError) {
        warn!(
            event = %event,
            error = %error,
            "Store operation failed, applying fallback"
        );
    }
}

/// Applies the substitution table and reports each failure.
#[derive(Clone)]
pub struct FallbackPolicy {
    sink: Arc<dyn WarnSink>,
}

impl FallbackPolicy {
    /// Create a policy that reports to `sink`.
    pub fn new(sink: Arc<dyn WarnSink>) -> Self {
        Self { sink }
    }

    /// Count to assume when the current bucket could not be read.
    pub fn current_read_failed(&self, error: KvLimitError) -> u64 {
        self.sink.warn(FallbackEvent::CurrentBucketRead, &error);
        0
    }

    /// The incremented bucket could not be written; the decision proceeds.
    pub fn current_write_failed(&self, error: KvLimitError) {
        self.sink.warn(FallbackEvent::CurrentBucketWrite, &error);
    }

    /// Total to use when the window scan failed.
    ///
    /// Partial results are discarded in favour of the current bucket's
    /// in-memory count.
    pub fn window_scan_failed(&self, error: KvLimitError, recorded: u64) -> u64 {
        self.sink.warn(FallbackEvent::WindowScan, &error);
        recorded
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPolicy").finish_non_exhaustive()
    }
}
