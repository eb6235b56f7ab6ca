//! Configuration management for kvlimit.

use serde::{Deserialize, Serialize};

use crate::error::{KvLimitError, Result};
use crate::ratelimit::PolicySet;

/// Prefix of environment variables that override file settings, e.g.
/// `KVLIMIT__RATE_LIMITING__DEFAULT__LIMIT=100`.
pub const ENV_PREFIX: &str = "KVLIMIT";

/// Main configuration for kvlimit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvLimitConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Store backend configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Rate limiting policies
    #[serde(default)]
    pub rate_limiting: PolicySet,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which store holds the buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store; counts are not shared between processes
    #[default]
    Memory,
    /// Redis or a Redis-compatible server
    Redis,
}

/// Store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Connection URL for the Redis backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

impl KvLimitConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: KvLimitConfig = serde_yaml::from_str(yaml)
            .map_err(|e| KvLimitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load layered configuration: defaults, then the optional file at
    /// `path` (format chosen by extension), then `KVLIMIT__*` environment
    /// variables.
    ///
    /// Runs before the tracing subscriber is installed, so it logs nothing.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: KvLimitConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.validate()?;

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_none() {
            return Err(KvLimitError::Config(
                "store.redis_url is required for the redis backend".to_string(),
            ));
        }
        Ok(())
    }
}
