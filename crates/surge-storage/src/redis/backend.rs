//! Redis implementation of the cache substrate

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use surge_core::{CacheStore, SurgeError};

use super::config::RedisConfig;

/// Atomic compare-and-delete: frees a lock key only if it still holds the
/// caller's token. The GET and the DEL execute as one scripted step.
const DELETE_IF_EQUALS: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end";

/// Redis cache substrate
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    delete_if_equals: Arc<redis::Script>,
}

impl RedisCache {
    /// Create a new Redis substrate
    pub async fn new(config: RedisConfig) -> Result<Self, SurgeError> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| SurgeError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| SurgeError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            delete_if_equals: Arc::new(redis::Script::new(DELETE_IF_EQUALS)),
        })
    }

    /// Get prefix for a key
    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Get connection from pool
    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, SurgeError> {
        self.pool
            .get()
            .await
            .map_err(|e| SurgeError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.get(&prefixed)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        match ttl {
            Some(ttl) => conn
                .pset_ex(&prefixed, value, ttl.as_millis() as u64)
                .await
                .map_err(|e| SurgeError::Backend(e.to_string())),
            None => conn
                .set(&prefixed, value)
                .await
                .map_err(|e| SurgeError::Backend(e.to_string())),
        }
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        // SET NX PX: the conditional write and the TTL land in one command
        let result: Option<String> = redis::cmd("SET")
            .arg(&prefixed)
            .arg(&value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut *conn)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.del(&prefixed)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let deleted: i64 = self
            .delete_if_equals
            .key(&prefixed)
            .arg(expected)
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.exists(&prefixed)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))
    }

    async fn incr(&self, key: &str) -> Result<i64, SurgeError> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.incr(&prefixed, 1i64)
            .await
            .map_err(|e| SurgeError::Backend(e.to_string()))
    }
}
