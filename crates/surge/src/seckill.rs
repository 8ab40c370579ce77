//! Flash-sale order placement

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use surge_core::{CacheStore, Order, OrderStore, Placement, Rejection, Result, SurgeError};

use crate::id::IdWorker;
use crate::lock::DistLock;

/// Configuration for SeckillFlow
#[derive(Debug, Clone)]
pub struct SeckillConfig {
    /// TTL of the per-user dedup lock; must outlive the store round-trips it
    /// guards
    pub lock_ttl: Duration,
    /// Business tag used for order ids
    pub order_tag: String,
}

impl Default for SeckillConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(1200),
            order_tag: "order".to_string(),
        }
    }
}

/// Exactly-once order placement under extreme concurrency
///
/// Two mechanisms compose: the store-side conditional decrement serializes
/// stock changes across all users (no overselling), and a per-user lock
/// serializes the idempotency-check-then-insert window so one user cannot
/// slip two orders through it. Every guard rejects with a typed
/// [`Rejection`]; only substrate and store failures are errors.
pub struct SeckillFlow<C, O>
where
    C: CacheStore,
    O: OrderStore,
{
    cache: Arc<C>,
    store: Arc<O>,
    ids: IdWorker<C>,
    config: SeckillConfig,
}

impl<C, O> SeckillFlow<C, O>
where
    C: CacheStore,
    O: OrderStore,
{
    /// Create a flow with default config
    pub fn new(cache: Arc<C>, store: Arc<O>) -> Self {
        Self::with_config(cache, store, SeckillConfig::default())
    }

    /// Create with custom config
    pub fn with_config(cache: Arc<C>, store: Arc<O>, config: SeckillConfig) -> Self {
        let ids = IdWorker::new(cache.clone());
        Self {
            cache,
            store,
            ids,
            config,
        }
    }

    /// Attempt to place a flash-sale order for an already-resolved user
    ///
    /// Guards run in order: sale window, stock fast-path hint, per-user
    /// dedup lock (fail fast, duplicates don't queue), idempotency check,
    /// then the store's atomic decrement-and-insert. The lock is released
    /// whatever happens after it is taken.
    pub async fn place(&self, voucher_id: u64, user_id: u64) -> Result<Placement> {
        let Some(voucher) = self.store.find_voucher(voucher_id).await? else {
            return Err(SurgeError::NotFound(format!("voucher:{voucher_id}")));
        };

        let now = Utc::now();
        if now < voucher.begin_time {
            return Ok(Placement::Rejected(Rejection::TooEarly));
        }
        if now > voucher.end_time {
            return Ok(Placement::Rejected(Rejection::TooLate));
        }
        // hint only; the authoritative check is the conditional decrement
        if voucher.stock < 1 {
            return Ok(Placement::Rejected(Rejection::OutOfStock));
        }

        let lock = DistLock::new(self.cache.clone(), format!("order:{user_id}"));
        if !lock.try_lock(self.config.lock_ttl).await? {
            return Ok(Placement::Rejected(Rejection::LockBusy));
        }

        let outcome = self.place_locked(voucher_id, user_id).await;
        if let Err(error) = lock.unlock().await {
            tracing::warn!(
                target: "surge",
                user_id,
                %error,
                "failed to release order lock; TTL will reclaim it"
            );
        }
        outcome
    }

    async fn place_locked(&self, voucher_id: u64, user_id: u64) -> Result<Placement> {
        if self.store.find_order(user_id, voucher_id).await?.is_some() {
            return Ok(Placement::Rejected(Rejection::AlreadyOrdered));
        }

        let order_id = self.ids.next_id(&self.config.order_tag).await?;
        let order = Order {
            id: order_id,
            user_id,
            voucher_id,
            created_at: Utc::now(),
        };

        // conditional decrement + insert are one unit of work in the store;
        // zero rows affected means true exhaustion
        if !self.store.commit_order(&order).await? {
            return Ok(Placement::Rejected(Rejection::OutOfStock));
        }

        tracing::debug!(target: "surge", order_id, user_id, voucher_id, "order placed");
        Ok(Placement::Placed { order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::VoucherStock;
    use surge_storage::{MemoryCache, MemoryOrderStore};

    fn flow() -> (SeckillFlow<MemoryCache, MemoryOrderStore>, Arc<MemoryOrderStore>) {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryOrderStore::new());
        (SeckillFlow::new(cache, store.clone()), store)
    }

    fn open_voucher(id: u64, stock: u32) -> VoucherStock {
        VoucherStock {
            voucher_id: id,
            stock,
            begin_time: Utc::now() - chrono::Duration::hours(1),
            end_time: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_place_succeeds() {
        let (flow, store) = flow();
        store.put_voucher(open_voucher(1, 5));

        let placement = flow.place(1, 7).await.unwrap();
        assert!(placement.is_placed());
        assert_eq!(store.stock_of(1), Some(4));
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_too_early() {
        let (flow, store) = flow();
        let mut voucher = open_voucher(1, 5);
        voucher.begin_time = Utc::now() + chrono::Duration::hours(1);
        voucher.end_time = Utc::now() + chrono::Duration::hours(2);
        store.put_voucher(voucher);

        let placement = flow.place(1, 7).await.unwrap();
        assert_eq!(placement.rejection(), Some(Rejection::TooEarly));
    }

    #[tokio::test]
    async fn test_too_late() {
        let (flow, store) = flow();
        let mut voucher = open_voucher(1, 5);
        voucher.begin_time = Utc::now() - chrono::Duration::hours(2);
        voucher.end_time = Utc::now() - chrono::Duration::hours(1);
        store.put_voucher(voucher);

        let placement = flow.place(1, 7).await.unwrap();
        assert_eq!(placement.rejection(), Some(Rejection::TooLate));
    }

    #[tokio::test]
    async fn test_out_of_stock_hint() {
        let (flow, store) = flow();
        store.put_voucher(open_voucher(1, 0));

        let placement = flow.place(1, 7).await.unwrap();
        assert_eq!(placement.rejection(), Some(Rejection::OutOfStock));
    }

    #[tokio::test]
    async fn test_second_order_rejected() {
        let (flow, store) = flow();
        store.put_voucher(open_voucher(1, 5));

        assert!(flow.place(1, 7).await.unwrap().is_placed());
        let second = flow.place(1, 7).await.unwrap();
        assert_eq!(second.rejection(), Some(Rejection::AlreadyOrdered));
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_voucher() {
        let (flow, _store) = flow();
        assert!(flow.place(42, 7).await.is_err());
    }

    #[tokio::test]
    async fn test_different_users_share_stock() {
        let (flow, store) = flow();
        store.put_voucher(open_voucher(1, 2));

        assert!(flow.place(1, 7).await.unwrap().is_placed());
        assert!(flow.place(1, 8).await.unwrap().is_placed());
        let third = flow.place(1, 9).await.unwrap();
        assert_eq!(third.rejection(), Some(Rejection::OutOfStock));
        assert_eq!(store.stock_of(1), Some(0));
    }
}
