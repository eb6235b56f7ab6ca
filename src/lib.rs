//! kvlimit - Approximate Sliding-Window Rate Limiting
//!
//! This crate implements a sliding-window rate limiter on top of a remote,
//! eventually-consistent key-value store with per-key TTL expiry. Counts are
//! kept in independent per-second buckets, so a store without atomic
//! increments or transactions is enough; the price is that racing callers
//! may lose increments, which the design accepts.

pub mod config;
pub mod error;
pub mod ratelimit;
