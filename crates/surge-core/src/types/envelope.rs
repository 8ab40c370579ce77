//! Logical-expiration envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A domain value wrapped with an application-level expiry timestamp
///
/// The substrate's own TTL (if any) is irrelevant to this envelope: the entry
/// is written without one and staleness is judged solely by comparing
/// `expires_at` to now. Created by the rebuild path; read and discarded
/// (never mutated in place) by readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    /// The wrapped domain value
    pub payload: T,
    /// Logical expiry; past this instant the payload is stale but servable
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEnvelope<T> {
    /// Wrap a value, expiring `ttl` from now
    pub fn new(payload: T, ttl: Duration) -> Self {
        Self {
            payload,
            expires_at: Utc::now() + ttl,
        }
    }

    /// Check if the envelope is logically expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
