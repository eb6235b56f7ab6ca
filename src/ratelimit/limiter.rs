//! Policy-aware rate limiter.

use parking_lot::RwLock;
use tracing::trace;

use super::decision::RateLimitDecision;
use super::rules::{PolicySet, WindowConfig};
use super::store::Store;
use super::window::WindowCounter;
use crate::error::Result;

/// A window counter paired with a set of named policies.
///
/// The policy set can be swapped at runtime; calls already in flight keep the
/// settings they resolved when they started.
pub struct RateLimiter<S: Store + ?Sized> {
    counter: WindowCounter<S>,
    policies: RwLock<PolicySet>,
}

impl<S: Store + ?Sized> RateLimiter<S> {
    /// Create a rate limiter with default settings.
    pub fn new(counter: WindowCounter<S>) -> Self {
        Self::with_policies(counter, PolicySet::default())
    }

    /// Create a rate limiter with a policy set.
    pub fn with_policies(counter: WindowCounter<S>, policies: PolicySet) -> Self {
        Self {
            counter,
            policies: RwLock::new(policies),
        }
    }

    /// Replace the policy set.
    pub fn set_policies(&self, policies: PolicySet) {
        let mut current = self.policies.write();
        *current = policies;
    }

    /// Get a copy of the current policy set.
    pub fn policies(&self) -> PolicySet {
        self.policies.read().clone()
    }

    /// Get the underlying counter.
    pub fn counter(&self) -> &WindowCounter<S> {
        &self.counter
    }

    /// Record one event for `scope` under the named policy.
    ///
    /// Unknown or absent policy names use the default settings.
    pub async fn check(&self, policy: Option<&str>, scope: &str) -> RateLimitDecision {
        let config = self.resolve(policy);

        trace!(
            policy = policy.unwrap_or("default"),
            scope = %scope,
            "Checking rate limit"
        );

        self.counter.record_and_evaluate(scope, &config).await
    }

    /// Current window total for `scope` under the named policy, without
    /// recording an event.
    pub async fn window_total(&self, policy: Option<&str>, scope: &str) -> Result<u64> {
        let config = self.resolve(policy);
        self.counter.window_total(scope, &config).await
    }

    fn resolve(&self, policy: Option<&str>) -> WindowConfig {
        self.policies.read().resolve(policy).clone()
    }
}
