//! Cache-aside client with anti-penetration and stampede avoidance

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use surge_core::{CacheEnvelope, CacheStore, JsonSerializer, Result, Serializer, SurgeError};

use crate::lock::DistLock;

mod rebuild;
use rebuild::RebuildPool;

/// Trait for loading authoritative data on cache miss
#[async_trait]
pub trait Loader<K, V>: Send + Sync + 'static {
    /// Load the entity for `key` from the store of record
    ///
    /// `Ok(None)` means the store has no such entity; only infrastructure
    /// failures are errors.
    async fn load(&self, key: &K) -> Result<Option<V>>;
}

/// Configuration for CacheClient
#[derive(Debug, Clone)]
pub struct CacheClientConfig {
    /// TTL of cached null markers (anti-penetration window)
    pub null_ttl: Duration,
    /// TTL of the per-key rebuild lock
    pub lock_ttl: Duration,
    /// Sleep between retries while another caller rebuilds (mutex strategy)
    pub lock_retry_delay: Duration,
    /// Retry budget of the mutex strategy before giving up with LockConflict
    pub max_lock_retries: u32,
    /// Worker count of the async rebuild pool (logical-expiration strategy)
    pub rebuild_workers: usize,
}

impl Default for CacheClientConfig {
    fn default() -> Self {
        Self {
            null_ttl: Duration::from_secs(120),
            lock_ttl: Duration::from_secs(10),
            lock_retry_delay: Duration::from_millis(50),
            max_lock_retries: 100,
            rebuild_workers: 10,
        }
    }
}

/// Classification of a raw cache read
enum Lookup<T> {
    /// A real cached value
    Hit(T),
    /// The null marker: the store is known to have nothing here
    Null,
    /// Nothing cached
    Miss,
}

/// Generic read-through cache client
///
/// Shields the store of record from repeated-miss and thundering-herd
/// pressure. Three read strategies are offered per call:
///
/// - [`query_with_pass_through`](CacheClient::query_with_pass_through):
///   plain cache-aside with null-value caching, no stampede protection
/// - [`query_with_mutex`](CacheClient::query_with_mutex): at most one
///   concurrent rebuild per key; other readers briefly block
/// - [`query_with_logical_expire`](CacheClient::query_with_logical_expire):
///   readers never block; stale data serves while one async rebuild runs
///
/// Generic over the substrate `B` and the serializer `S`.
pub struct CacheClient<B, S = JsonSerializer>
where
    B: CacheStore,
    S: Serializer,
{
    cache: Arc<B>,
    serializer: Arc<S>,
    config: CacheClientConfig,
    rebuilds: RebuildPool,
}

impl<B: CacheStore> CacheClient<B, JsonSerializer> {
    /// Create a client with the default JSON serializer
    pub fn new(cache: Arc<B>) -> Self {
        Self::with_config(cache, CacheClientConfig::default())
    }

    /// Create with custom config
    pub fn with_config(cache: Arc<B>, config: CacheClientConfig) -> Self {
        Self::with_serializer(cache, JsonSerializer, config)
    }
}

impl<B, S> CacheClient<B, S>
where
    B: CacheStore,
    S: Serializer,
{
    /// Create a client with a custom serializer
    pub fn with_serializer(cache: Arc<B>, serializer: S, config: CacheClientConfig) -> Self {
        let rebuilds = RebuildPool::new(config.rebuild_workers);
        Self {
            cache,
            serializer: Arc::new(serializer),
            config,
            rebuilds,
        }
    }

    /// Cache a value under `key` with a substrate TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let bytes = self.serializer.serialize(value)?;
        self.cache.set(key, bytes, Some(ttl)).await
    }

    /// Warm a value for logical-expiration reads
    ///
    /// The entry is written without a substrate TTL; staleness is judged
    /// solely by the envelope's expiry timestamp.
    pub async fn set_with_logical_expire<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let envelope = CacheEnvelope::new(value, ttl);
        let bytes = self.serializer.serialize(&envelope)?;
        self.cache.set(key, bytes, None).await
    }

    /// Drop a key, typically right after a store-side write
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        self.cache.delete(key).await
    }

    /// Cache-aside read with null-value caching, no stampede protection
    ///
    /// Hit: deserialize and return. Cached null marker: absent, without
    /// touching the store. Miss: call the loader; a confirmed absence caches
    /// the null marker for [`CacheClientConfig::null_ttl`], anything else is
    /// cached with `ttl`. Concurrent callers racing the same miss may each
    /// call the loader once; use the mutex strategy when that matters.
    pub async fn query_with_pass_through<K, T, L>(
        &self,
        prefix: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<T>>
    where
        K: Display + Send + Sync,
        T: Serialize + DeserializeOwned,
        L: Loader<K, T>,
    {
        let key = format!("{prefix}{id}");
        match self.read::<T>(&key).await? {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Null => Ok(None),
            Lookup::Miss => self.load_through(&key, id, loader, ttl).await,
        }
    }

    /// Cache-aside read with at most one concurrent rebuild per key
    ///
    /// On a miss the caller must win the per-key rebuild lock before calling
    /// the loader; losers sleep [`CacheClientConfig::lock_retry_delay`] and
    /// retry the whole read, up to [`CacheClientConfig::max_lock_retries`]
    /// times before failing with [`SurgeError::LockConflict`]. The lock is
    /// always released, including when the loader fails.
    pub async fn query_with_mutex<K, T, L>(
        &self,
        prefix: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<T>>
    where
        K: Display + Send + Sync,
        T: Serialize + DeserializeOwned,
        L: Loader<K, T>,
    {
        let key = format!("{prefix}{id}");
        let mut attempts = 0u32;
        loop {
            match self.read::<T>(&key).await? {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Null => return Ok(None),
                Lookup::Miss => {}
            }

            let lock = DistLock::new(self.cache.clone(), &key);
            if lock.try_lock(self.config.lock_ttl).await? {
                // double-check: the previous holder may have just filled the
                // cache between our read and the acquisition
                let rebuilt = async {
                    match self.read::<T>(&key).await? {
                        Lookup::Hit(value) => Ok(Some(value)),
                        Lookup::Null => Ok(None),
                        Lookup::Miss => self.load_through(&key, id, loader, ttl).await,
                    }
                }
                .await;
                release_lock(&lock).await;
                return rebuilt;
            }

            attempts += 1;
            if attempts > self.config.max_lock_retries {
                return Err(SurgeError::LockConflict(key));
            }
            tokio::time::sleep(self.config.lock_retry_delay).await;
        }
    }

    /// Stale-while-revalidate read over pre-warmed entries
    ///
    /// A true miss returns absent without consulting the store: this strategy
    /// assumes hot keys were warmed via
    /// [`set_with_logical_expire`](CacheClient::set_with_logical_expire).
    /// A fresh envelope returns its payload. An expired one starts at most
    /// one async rebuild per staleness episode (fail-fast lock plus a
    /// double-check under it) and serves the stale payload to everyone in
    /// the meantime. Loader failures are logged, the lock is still released,
    /// and stale data keeps serving until the next episode.
    pub async fn query_with_logical_expire<K, T, L>(
        &self,
        prefix: &str,
        id: &K,
        loader: Arc<L>,
        ttl: Duration,
    ) -> Result<Option<T>>
    where
        K: Display + Clone + Send + Sync + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        L: Loader<K, T>,
    {
        let key = format!("{prefix}{id}");
        let Some(bytes) = self.cache.get(&key).await? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        let envelope: CacheEnvelope<T> = self.serializer.deserialize(&bytes)?;
        if !envelope.is_expired() {
            return Ok(Some(envelope.payload));
        }

        // expired: whoever wins the fail-fast lock owns this episode's
        // rebuild; everyone else returns the stale payload immediately
        let lock = DistLock::new(self.cache.clone(), &key);
        if !lock.try_lock(self.config.lock_ttl).await? {
            return Ok(Some(envelope.payload));
        }

        // double-check under the lock: a competing rebuild may have finished
        // between our expiry check and the acquisition
        match self.recheck::<T>(&key).await {
            Ok(Some(fresh)) => {
                release_lock(&lock).await;
                return Ok(Some(fresh));
            }
            Err(error) => {
                release_lock(&lock).await;
                return Err(error);
            }
            Ok(None) => {}
        }

        self.spawn_rebuild(key, id.clone(), loader, ttl, lock);
        Ok(Some(envelope.payload))
    }

    /// Classify a raw cache read
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Lookup<T>> {
        match self.cache.get(key).await? {
            Some(bytes) if bytes.is_empty() => Ok(Lookup::Null),
            Some(bytes) => Ok(Lookup::Hit(self.serializer.deserialize(&bytes)?)),
            None => Ok(Lookup::Miss),
        }
    }

    /// Load from the store and fill the cache; absence caches the null marker
    async fn load_through<K, T, L>(
        &self,
        key: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<T>>
    where
        K: Display + Send + Sync,
        T: Serialize + DeserializeOwned,
        L: Loader<K, T>,
    {
        match loader.load(id).await? {
            Some(value) => {
                self.set(key, &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                self.cache
                    .set(key, Vec::new(), Some(self.config.null_ttl))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Re-read an expired key under the rebuild lock
    ///
    /// `Ok(Some(_))` carries a payload that turned fresh in the meantime;
    /// `Ok(None)` means the entry is still expired (or vanished) and the
    /// rebuild should proceed.
    async fn recheck<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await? {
            Some(bytes) if !bytes.is_empty() => {
                let current: CacheEnvelope<T> = self.serializer.deserialize(&bytes)?;
                if current.is_expired() {
                    Ok(None)
                } else {
                    Ok(Some(current.payload))
                }
            }
            _ => Ok(None),
        }
    }

    /// Hand one rebuild to the pool; the lock travels with the task
    fn spawn_rebuild<K, T, L>(
        &self,
        key: String,
        id: K,
        loader: Arc<L>,
        ttl: Duration,
        lock: DistLock<B>,
    ) where
        K: Display + Send + Sync + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        L: Loader<K, T>,
    {
        let cache = Arc::clone(&self.cache);
        let serializer = Arc::clone(&self.serializer);
        self.rebuilds.submit(async move {
            let outcome: Result<()> = async {
                match loader.load(&id).await? {
                    Some(value) => {
                        let bytes = {
                            let envelope = CacheEnvelope::new(&value, ttl);
                            serializer.serialize(&envelope)?
                        };
                        cache.set(&key, bytes, None).await
                    }
                    None => {
                        // the entity vanished from the store: end the episode
                        cache.delete(&key).await.map(|_| ())
                    }
                }
            }
            .await;

            if let Err(error) = outcome {
                tracing::warn!(
                    target: "surge",
                    key = %key,
                    %error,
                    "async cache rebuild failed; stale data keeps serving"
                );
            }
            release_lock(&lock).await;
        });
    }
}

impl<B, S> Clone for CacheClient<B, S>
where
    B: CacheStore,
    S: Serializer,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            serializer: self.serializer.clone(),
            config: self.config.clone(),
            rebuilds: self.rebuilds.clone(),
        }
    }
}

/// Release a rebuild lock, logging instead of failing: the TTL reclaims the
/// key either way
async fn release_lock<B: CacheStore>(lock: &DistLock<B>) {
    if let Err(error) = lock.unlock().await {
        tracing::warn!(
            target: "surge",
            key = %lock.key(),
            %error,
            "failed to release rebuild lock; TTL will reclaim it"
        );
    }
}
