//! Authoritative store trait for the order path

use crate::{Order, SurgeError, VoucherStock};
use async_trait::async_trait;

/// Store of record for vouchers and orders
///
/// The relational schema and query execution behind these operations are out
/// of scope; the flow only requires the contract below. The one hard
/// constraint is on [`commit_order`](OrderStore::commit_order): the stock
/// decrement and the order insert must be one atomic unit of work in the
/// store, never a read-modify-write at the application layer.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Load a voucher with its current stock and sale window
    async fn find_voucher(&self, voucher_id: u64) -> Result<Option<VoucherStock>, SurgeError>;

    /// Find an existing order for this (user, voucher) pair
    async fn find_order(&self, user_id: u64, voucher_id: u64)
    -> Result<Option<Order>, SurgeError>;

    /// Decrement the voucher's stock where stock > 0 and insert the order,
    /// all-or-nothing
    ///
    /// Returns `false` when the conditional decrement affects zero rows
    /// (stock exhausted); in that case nothing is persisted. If the insert
    /// fails after the decrement, the decrement must roll back.
    async fn commit_order(&self, order: &Order) -> Result<bool, SurgeError>;
}
