//! Cache substrate trait

use crate::SurgeError;
use async_trait::async_trait;
use std::time::Duration;

/// Core trait for the shared key-value cache substrate
///
/// One logical keyspace, byte values. This is the only shared mutable
/// resource besides the order store: the cache-aside client, the distributed
/// lock and the id generator are all built on these seven operations.
/// Implementations include the in-process memory cache and Redis.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SurgeError>;

    /// Set a value, with an optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), SurgeError>;

    /// Atomically set a value only if the key is absent
    ///
    /// Returns `true` if the set succeeded. The write carries the given TTL,
    /// so a holder that never deletes the key frees it by expiry.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, SurgeError>;

    /// Delete a key
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> Result<bool, SurgeError>;

    /// Atomically delete a key only if its current value equals `expected`
    ///
    /// The check and the delete are a single indivisible step. Returns `true`
    /// if the key held `expected` and was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool, SurgeError>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool, SurgeError>;

    /// Atomically increment the integer value stored at `key` by one
    ///
    /// An absent key counts up from zero, so the first call returns 1. The
    /// increment must be atomic across all processes sharing the substrate.
    /// Fails with [`SurgeError::Backend`] if the key holds a non-integer.
    async fn incr(&self, key: &str) -> Result<i64, SurgeError>;
}
