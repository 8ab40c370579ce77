//! In-memory cache substrate using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use surge_core::{CacheStore, SurgeError};

/// A stored value with its absolute expiry instant
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(bytes: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            bytes,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// In-process cache substrate
///
/// Uses `DashMap` for concurrent access; expired entries are dropped lazily
/// on the next access. `incr` follows the substrate's integer convention:
/// values are stored as ASCII decimal, and an absent key counts up from zero.
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone, Default)]
pub struct MemoryCache {
    data: Arc<DashMap<String, StoredValue>>,
}

impl MemoryCache {
    /// Create a new, empty memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including not-yet-collected expired ones
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SurgeError> {
        if let Some(value) = self.data.get(key) {
            if value.is_expired() {
                drop(value);
                self.data.remove_if(key, |_, v| v.is_expired());
                return Ok(None);
            }
            return Ok(Some(value.bytes.clone()));
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), SurgeError> {
        self.data
            .insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, SurgeError> {
        use dashmap::mapref::entry::Entry;

        // the entry lock makes check-then-insert atomic
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_expired() => {
                occupied.insert(StoredValue::new(value, Some(ttl)));
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, Some(ttl)));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, SurgeError> {
        match self.data.remove(key) {
            Some((_, value)) => Ok(!value.is_expired()),
            None => Ok(false),
        }
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool, SurgeError> {
        let removed = self
            .data
            .remove_if(key, |_, v| !v.is_expired() && v.bytes == expected);
        Ok(removed.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, SurgeError> {
        match self.data.get(key) {
            Some(value) => Ok(!value.is_expired()),
            None => Ok(false),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, SurgeError> {
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new(b"0".to_vec(), None));

        if entry.is_expired() {
            *entry = StoredValue::new(b"0".to_vec(), None);
        }

        let current: i64 = std::str::from_utf8(&entry.bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SurgeError::Backend(format!("value at {key} is not an integer")))?;

        let next = current + 1;
        entry.bytes = next.to_string().into_bytes();
        Ok(next)
    }
}
