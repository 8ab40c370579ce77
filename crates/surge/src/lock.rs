//! Distributed mutual-exclusion lock over the cache substrate

use std::sync::Arc;
use std::time::Duration;

use surge_core::{CacheStore, Result};

const LOCK_PREFIX: &str = "lock:";

/// A named exclusive lock with a TTL
///
/// Acquisition is a conditional set of this instance's random token;
/// release is an atomic compare-and-delete against it, so a holder whose
/// critical section outlives the TTL cannot free a lock that was since
/// re-acquired by someone else. If the holder crashes before [`unlock`],
/// the key self-heals by TTL expiry; the TTL must exceed the longest
/// expected critical section or a second holder can run concurrently.
///
/// [`unlock`]: DistLock::unlock
pub struct DistLock<B: CacheStore> {
    cache: Arc<B>,
    key: String,
    token: String,
}

impl<B: CacheStore> DistLock<B> {
    /// Create a lock handle for `name`
    ///
    /// Each handle carries its own fencing token; two handles for the same
    /// name compete for the same lock key.
    pub fn new(cache: Arc<B>, name: impl AsRef<str>) -> Self {
        Self {
            cache,
            key: format!("{LOCK_PREFIX}{}", name.as_ref()),
            token: format!("{:032x}", rand::random::<u128>()),
        }
    }

    /// The substrate key this lock occupies
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Try to acquire the lock, without blocking or retrying
    ///
    /// Returns `true` if this handle now holds the lock. The caller decides
    /// the retry policy.
    pub async fn try_lock(&self, ttl: Duration) -> Result<bool> {
        self.cache
            .set_if_absent(&self.key, self.token.clone().into_bytes(), ttl)
            .await
    }

    /// Release the lock if this handle still holds it
    ///
    /// Returns `true` if the key held this handle's token and was deleted.
    /// `false` means the lock expired and may have been re-acquired by
    /// another holder; nothing is deleted in that case.
    pub async fn unlock(&self) -> Result<bool> {
        let released = self
            .cache
            .delete_if_equals(&self.key, self.token.as_bytes())
            .await?;
        if !released {
            tracing::warn!(
                target: "surge",
                key = %self.key,
                "lock expired or changed hands before release"
            );
        }
        Ok(released)
    }
}
