//! surge-core: Core traits and types for the surge library
//!
//! This crate provides the foundational types and traits used throughout
//! the surge ecosystem.

mod error;
mod traits;
mod types;

pub use error::{Result, SurgeError};
pub use traits::*;
pub use types::*;
