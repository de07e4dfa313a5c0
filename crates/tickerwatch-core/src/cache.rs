//! Cache entry model and expiry policy shared by the ticker and history caches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Anything that remembers when its value was fetched.
pub trait Fetched {
    /// Epoch milliseconds of the successful fetch that produced the value.
    fn fetched_at_ms(&self) -> i64;
}

/// A value plus the wall-clock time of the fetch that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedValue<T> {
    pub value: T,
    pub fetched_at_epoch_ms: i64,
}

impl<T> CachedValue<T> {
    pub fn new(value: T, fetched_at_epoch_ms: i64) -> Self {
        Self {
            value,
            fetched_at_epoch_ms,
        }
    }
}

impl<T> Fetched for CachedValue<T> {
    fn fetched_at_ms(&self) -> i64 {
        self.fetched_at_epoch_ms
    }
}

/// `true` once strictly more than `ttl_ms` has passed since the fetch.
///
/// A fetch time in the future (clock skew) yields a negative age and is never
/// expired.
pub const fn is_expired(fetched_at_ms: i64, ttl_ms: i64, now_ms: i64) -> bool {
    now_ms.saturating_sub(fetched_at_ms) > ttl_ms
}

/// TTL applied to one class of cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    ttl: Duration,
}

impl ExpiryPolicy {
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn is_expired(&self, entry: &impl Fetched, now_ms: i64) -> bool {
        is_expired(entry.fetched_at_ms(), self.ttl_ms(), now_ms)
    }

    pub fn is_fresh(&self, entry: &impl Fetched, now_ms: i64) -> bool {
        !self.is_expired(entry, now_ms)
    }
}
