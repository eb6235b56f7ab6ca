//! Sliding-window rate limiting over key-value stores.

mod clock;
mod decision;
mod fallback;
mod key;
mod limiter;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;
mod rules;
mod store;
mod window;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{evaluate, RateLimitDecision};
pub use fallback::{FallbackEvent, FallbackPolicy, TracingSink, WarnSink};
pub use key::{build_key, window_keys, BucketKey};
pub use limiter::RateLimiter;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use rules::{PolicySet, WindowConfig};
pub use store::Store;
pub use window::WindowCounter;
