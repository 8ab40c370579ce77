//! In-memory order store

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use surge_core::{Order, OrderStore, SurgeError, VoucherStock};

#[derive(Default)]
struct Inner {
    vouchers: HashMap<u64, VoucherStock>,
    orders: HashMap<u64, Order>,
    /// (user_id, voucher_id) -> order id
    by_user: HashMap<(u64, u64), u64>,
}

/// In-process store of record for vouchers and orders
///
/// A single mutex guards all three tables, so `commit_order` is genuinely
/// all-or-nothing: the conditional decrement and the insert happen under one
/// critical section, the in-process equivalent of the store-side transaction.
/// Cloning creates a new handle to the SAME underlying tables.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryOrderStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a voucher row (seeding for warmers and tests)
    pub fn put_voucher(&self, voucher: VoucherStock) {
        self.inner.lock().vouchers.insert(voucher.voucher_id, voucher);
    }

    /// Current stock for a voucher, if it exists
    pub fn stock_of(&self, voucher_id: u64) -> Option<u32> {
        self.inner.lock().vouchers.get(&voucher_id).map(|v| v.stock)
    }

    /// Number of persisted orders
    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_voucher(&self, voucher_id: u64) -> Result<Option<VoucherStock>, SurgeError> {
        Ok(self.inner.lock().vouchers.get(&voucher_id).cloned())
    }

    async fn find_order(
        &self,
        user_id: u64,
        voucher_id: u64,
    ) -> Result<Option<Order>, SurgeError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_user
            .get(&(user_id, voucher_id))
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn commit_order(&self, order: &Order) -> Result<bool, SurgeError> {
        let mut inner = self.inner.lock();

        let Some(voucher) = inner.vouchers.get_mut(&order.voucher_id) else {
            return Err(SurgeError::NotFound(format!(
                "voucher:{}",
                order.voucher_id
            )));
        };
        if voucher.stock == 0 {
            // zero rows affected: stock exhausted, nothing persisted
            return Ok(false);
        }
        voucher.stock -= 1;

        inner.orders.insert(order.id, order.clone());
        inner
            .by_user
            .insert((order.user_id, order.voucher_id), order.id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn voucher(id: u64, stock: u32) -> VoucherStock {
        VoucherStock {
            voucher_id: id,
            stock,
            begin_time: Utc::now() - chrono::Duration::hours(1),
            end_time: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn order(id: u64, user_id: u64, voucher_id: u64) -> Order {
        Order {
            id,
            user_id,
            voucher_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_voucher() {
        let store = MemoryOrderStore::new();
        store.put_voucher(voucher(1, 5));

        let found = store.find_voucher(1).await.unwrap().unwrap();
        assert_eq!(found.stock, 5);
        assert!(store.find_voucher(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_decrements_and_inserts() {
        let store = MemoryOrderStore::new();
        store.put_voucher(voucher(1, 2));

        assert!(store.commit_order(&order(100, 7, 1)).await.unwrap());
        assert_eq!(store.stock_of(1), Some(1));
        assert_eq!(store.order_count(), 1);

        let found = store.find_order(7, 1).await.unwrap().unwrap();
        assert_eq!(found.id, 100);
    }

    #[tokio::test]
    async fn test_commit_exhausted_persists_nothing() {
        let store = MemoryOrderStore::new();
        store.put_voucher(voucher(1, 1));

        assert!(store.commit_order(&order(100, 7, 1)).await.unwrap());
        assert!(!store.commit_order(&order(101, 8, 1)).await.unwrap());

        assert_eq!(store.stock_of(1), Some(0));
        assert_eq!(store.order_count(), 1);
        assert!(store.find_order(8, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_unknown_voucher() {
        let store = MemoryOrderStore::new();
        assert!(store.commit_order(&order(100, 7, 9)).await.is_err());
    }
}
