//! Bucket key generation and parsing.

/// Separator between the prefix, scope and epoch second of a store key.
const SEPARATOR: char = ':';

/// Build the store key for one per-second bucket.
///
/// Format: `{prefix}:{scope}:{epoch_second}`. The output depends only on the
/// inputs, so independent processes address the same bucket for the same
/// scope and second.
pub fn build_key(prefix: &str, scope: &str, epoch_second: u64) -> String {
    format!("{prefix}{SEPARATOR}{scope}{SEPARATOR}{epoch_second}")
}

/// Enumerate the bucket keys of a window ending at `now_sec`, newest first.
///
/// Yields `window_sec` keys for `now_sec, now_sec - 1, ...`; seconds before
/// the epoch are skipped.
pub fn window_keys(prefix: &str, scope: &str, now_sec: u64, window_sec: u64) -> Vec<String> {
    (0..window_sec)
        .map_while(|offset| now_sec.checked_sub(offset))
        .map(|second| build_key(prefix, scope, second))
        .collect()
}

/// A key that uniquely identifies a bucket in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// Namespace prefix shared by all buckets of a limiter
    pub prefix: String,
    /// Caller-supplied partition, e.g. a client IP or API key
    pub scope: String,
    /// The UNIX second this bucket counts
    pub epoch_second: u64,
}

impl BucketKey {
    /// Create a new bucket key.
    pub fn new(prefix: &str, scope: &str, epoch_second: u64) -> Self {
        Self {
            prefix: prefix.to_string(),
            scope: scope.to_string(),
            epoch_second,
        }
    }

    /// Convert to the string used as the store key.
    pub fn to_store_key(&self) -> String {
        build_key(&self.prefix, &self.scope, self.epoch_second)
    }

    /// Parse a store key written under `prefix`.
    ///
    /// The epoch second is split off from the right, so scopes that contain
    /// the separator (IPv6 addresses, for one) round-trip intact.
    pub fn parse(prefix: &str, key: &str) -> Option<Self> {
        let rest = key.strip_prefix(prefix)?.strip_prefix(SEPARATOR)?;

        let last_sep = rest.rfind(SEPARATOR)?;
        let epoch_second: u64 = rest[last_sep + 1..].parse().ok()?;
        let scope = &rest[..last_sep];

        Some(Self::new(prefix, scope, epoch_second))
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_store_key())
    }
}
