//! surge-storage: Storage backends for the surge library
//!
//! Provides the in-process memory implementations of the cache substrate and
//! order store (default, used for tests and single-node deployments) and the
//! Redis cache substrate (feature `redis`).

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryCache, MemoryOrderStore};

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::{RedisCache, RedisConfig};
