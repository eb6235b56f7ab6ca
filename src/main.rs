use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kvlimit::config::{KvLimitConfig, LoggingConfig, StoreBackend, StoreConfig};
use kvlimit::ratelimit::{MemoryStore, RateLimiter, Store, WindowCounter};

/// Approximate sliding-window rate limiting over key-value stores.
#[derive(Debug, Parser)]
#[command(name = "kvlimit", version, about)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON); KVLIMIT__* variables override it
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record events for a scope and print each decision
    Check {
        /// Scope to count against, e.g. a client IP or API key
        #[arg(short, long)]
        scope: String,

        /// Named policy; the default settings apply when omitted or unknown
        #[arg(short, long)]
        policy: Option<String>,

        /// Number of events to record
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,

        /// Print decisions as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as YAML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = KvLimitConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!(path = %path, "Loaded configuration file");
    }
    debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Command::Check {
            scope,
            policy,
            repeat,
            json,
        } => {
            let store = open_store(&config.store).await?;
            let limiter = RateLimiter::with_policies(
                WindowCounter::new(store),
                config.rate_limiting.clone(),
            );

            for _ in 0..repeat {
                let decision = limiter.check(policy.as_deref(), &scope).await;
                if json {
                    println!("{}", serde_json::to_string(&decision)?);
                } else {
                    println!(
                        "{} total={} limit={} remaining={}",
                        if decision.allowed { "ALLOW" } else { "DENY" },
                        decision.total,
                        decision.limit,
                        decision.remaining()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Open the configured store backend.
async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; counts are local to this process");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => open_redis(config).await,
    }
}

#[cfg(feature = "redis")]
async fn open_redis(config: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    let url = config
        .redis_url
        .as_deref()
        .context("store.redis_url is required for the redis backend")?;
    let store = kvlimit::ratelimit::RedisStore::connect(url).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_config: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    anyhow::bail!("kvlimit was built without the `redis` feature")
}
