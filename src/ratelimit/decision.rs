//! Allow/deny decision for a window total.

use serde::{Deserialize, Serialize};

/// Whether a window total is within `limit`.
///
/// The boundary is inclusive: a total equal to the limit is allowed, and the
/// event that pushes the total to `limit + 1` is the first one denied.
pub fn evaluate(total: u64, limit: u64) -> bool {
    total <= limit
}

/// The outcome of recording one event against a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the event is within the limit
    pub allowed: bool,
    /// Sum of the readable bucket counts in the window, this event included
    pub total: u64,
    /// The configured limit, echoed back
    pub limit: u64,
}

impl RateLimitDecision {
    /// Build the decision for a window total.
    pub fn new(total: u64, limit: u64) -> Self {
        Self {
            allowed: evaluate(total, limit),
            total,
            limit,
        }
    }

    /// Events left in the window before denials start.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.total)
    }
}
