//! surge: caching and flash-sale concurrency primitives for Rust
//!
//! # Features
//!
//! - **Cache-aside reads** with null-value caching (anti-penetration)
//! - **Stampede avoidance** two ways: blocking mutex rebuild, and
//!   non-blocking logical-expiration rebuild on a bounded async pool
//! - **Distributed locking** with fenced release (compare-and-delete)
//! - **Monotonic 64-bit id generation** safe across processes
//! - **Exactly-once flash-sale ordering** under extreme concurrency
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use surge::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(MemoryCache::new());
//!     let client = CacheClient::new(cache);
//!
//!     client.set("shop:1", &"noodle bar", Duration::from_secs(60)).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod id;
mod lock;
mod seckill;

// Re-export core
pub use surge_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use surge_storage::{MemoryCache, MemoryOrderStore};

#[cfg(feature = "redis")]
pub use surge_storage::{RedisCache, RedisConfig};

pub use client::{CacheClient, CacheClientConfig, Loader};
pub use id::IdWorker;
pub use lock::DistLock;
pub use seckill::{SeckillConfig, SeckillFlow};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheClient, CacheClientConfig, CacheEnvelope, CacheStore, DistLock, IdWorker,
        JsonSerializer, Loader, Order, OrderStore, Placement, Rejection, Result, SeckillConfig,
        SeckillFlow, Serializer, SurgeError, VoucherStock,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryCache, MemoryOrderStore};

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeSerializer;
}
