//! Sliding-window settings and named policies.
//!
//! A policy file maps names (`login`, `api`, ...) to window settings so
//! callers can pick limits by name instead of passing them on every call:
//!
//! ```yaml
//! default:
//!   window_sec: 60
//!   limit: 60
//! policies:
//!   login:
//!     window_sec: 300
//!     limit: 5
//!     bucket_key_prefix: login
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{KvLimitError, Result};

/// Widest window accepted, one day.
pub const MAX_WINDOW_SEC: u64 = 86_400;

/// Window settings for one `record_and_evaluate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Width of the sliding window in seconds
    #[serde(default = "default_window_sec")]
    pub window_sec: u64,

    /// Maximum number of events allowed in the window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Namespace prefix for bucket keys
    #[serde(default = "default_bucket_key_prefix")]
    pub bucket_key_prefix: String,

    /// Bucket time-to-live in seconds; twice the window when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_ttl: Option<u64>,
}

fn default_window_sec() -> u64 {
    60
}

fn default_limit() -> u64 {
    60
}

fn default_bucket_key_prefix() -> String {
    "rl".to_string()
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_sec: default_window_sec(),
            limit: default_limit(),
            bucket_key_prefix: default_bucket_key_prefix(),
            bucket_ttl: None,
        }
    }
}

impl WindowConfig {
    /// Create settings for `limit` events per `window_sec` seconds.
    pub fn new(window_sec: u64, limit: u64) -> Self {
        Self {
            window_sec,
            limit,
            ..Self::default()
        }
    }

    /// Use a different key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bucket_key_prefix = prefix.into();
        self
    }

    /// Use an explicit bucket time-to-live.
    pub fn with_bucket_ttl(mut self, ttl_secs: u64) -> Self {
        self.bucket_ttl = Some(ttl_secs);
        self
    }

    /// Number of one-second buckets scanned per call, between one and
    /// `MAX_WINDOW_SEC`.
    pub fn scan_width(&self) -> u64 {
        self.window_sec.clamp(1, MAX_WINDOW_SEC)
    }

    /// The time-to-live written with every bucket.
    pub fn bucket_ttl_secs(&self) -> u64 {
        self.bucket_ttl
            .unwrap_or_else(|| self.scan_width().saturating_mul(2))
    }

    /// Reject settings that would make the window meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.window_sec == 0 {
            return Err(KvLimitError::Config(
                "window_sec must be at least 1".to_string(),
            ));
        }
        if self.window_sec > MAX_WINDOW_SEC {
            return Err(KvLimitError::Config(format!(
                "window_sec ({}s) exceeds the maximum of {MAX_WINDOW_SEC}s",
                self.window_sec
            )));
        }
        if self.bucket_key_prefix.is_empty() {
            return Err(KvLimitError::Config(
                "bucket_key_prefix must not be empty".to_string(),
            ));
        }
        if self.bucket_key_prefix.contains(':') {
            return Err(KvLimitError::Config(format!(
                "bucket_key_prefix {:?} must not contain ':'",
                self.bucket_key_prefix
            )));
        }
        if let Some(ttl) = self.bucket_ttl {
            if ttl < self.window_sec {
                return Err(KvLimitError::Config(format!(
                    "bucket_ttl ({ttl}s) is shorter than window_sec ({}s)",
                    self.window_sec
                )));
            }
        }
        Ok(())
    }
}

/// The default window settings plus any number of named policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    /// Settings used when no named policy matches
    #[serde(default)]
    pub default: WindowConfig,

    /// Named policies, keyed by lower-case name
    #[serde(default, deserialize_with = "deserialize_policies")]
    pub policies: HashMap<String, WindowConfig>,
}

/// Lower-case policy names, rejecting names that differ only in case.
fn deserialize_policies<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, WindowConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, WindowConfig>::deserialize(deserializer)?;
    let mut policies = HashMap::with_capacity(raw.len());
    for (name, config) in raw {
        let key = name.to_lowercase();
        if policies.insert(key, config).is_some() {
            return Err(serde::de::Error::custom(format!(
                "policy name {name:?} is defined more than once (names are case-insensitive)"
            )));
        }
    }
    Ok(policies)
}

impl PolicySet {
    /// Create a set with only default settings.
    pub fn new(default: WindowConfig) -> Self {
        Self {
            default,
            policies: HashMap::new(),
        }
    }

    /// Add or replace a named policy.
    pub fn with_policy(mut self, name: impl Into<String>, config: WindowConfig) -> Self {
        self.policies.insert(name.into().to_lowercase(), config);
        self
    }

    /// Parse a policy set from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let set: PolicySet = serde_yaml::from_str(yaml)
            .map_err(|e| KvLimitError::Config(format!("Failed to parse policies: {}", e)))?;
        set.validate()?;
        Ok(set)
    }

    /// Find a named policy. Names compare case-insensitively.
    pub fn find(&self, name: &str) -> Option<&WindowConfig> {
        self.policies.get(&name.to_lowercase())
    }

    /// Resolve a policy name, falling back to the default settings.
    pub fn resolve(&self, name: Option<&str>) -> &WindowConfig {
        match name {
            Some(name) => self.find(name).unwrap_or_else(|| {
                debug!(policy = %name, "Unknown policy, using default settings");
                &self.default
            }),
            None => &self.default,
        }
    }

    /// Validate the default and every named policy.
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for (name, config) in &self.policies {
            config
                .validate()
                .map_err(|e| KvLimitError::Config(format!("policy {name}: {e}")))?;
        }
        Ok(())
    }
}
