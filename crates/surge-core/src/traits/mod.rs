//! Trait definitions for surge

mod cache;
mod serializer;
mod store;

pub use cache::CacheStore;
pub use serializer::{JsonSerializer, Serializer};
pub use store::OrderStore;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;
