//! Redis store adapter.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;

use super::store::Store;
use crate::error::{KvLimitError, Result};

/// A `Store` backed by Redis `GET` and `SET EX`.
///
/// Only plain reads and writes are issued, so any Redis-compatible server
/// (including eventually-consistent replicas) can serve as the backend.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| KvLimitError::Config(format!("Invalid Redis URL: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| KvLimitError::Connection(e.to_string()))?;

        info!(url = %url, "Connected to Redis store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| KvLimitError::store_read(key, e))
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1))
            .await
            .map_err(|e| KvLimitError::store_write(key, e))
    }
}
