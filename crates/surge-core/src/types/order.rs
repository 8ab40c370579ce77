//! Voucher and order rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flash-sale voucher with its remaining stock and sale window
///
/// Owned by the store; the stock column is only ever mutated through the
/// store's atomic decrement-if-positive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStock {
    pub voucher_id: u64,
    /// Remaining inventory; never goes negative
    pub stock: u32,
    /// Sale opens at this instant
    pub begin_time: DateTime<Utc>,
    /// Sale closes at this instant
    pub end_time: DateTime<Utc>,
}

/// A placed flash-sale order
///
/// At most one order exists per (user_id, voucher_id) pair. Created exactly
/// once per successful placement; never mutated, never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Globally unique 64-bit id from the id generator
    pub id: u64,
    pub user_id: u64,
    pub voucher_id: u64,
    pub created_at: DateTime<Utc>,
}
