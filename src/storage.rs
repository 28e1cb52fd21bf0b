//! Pluggable key-value store for rate-limit counters and cached results.
//!
//! The orchestrator and rate limiter share one [`KvStore`] collaborator:
//! string values with per-key TTLs and an atomic increment. [`MemoryStore`]
//! is the in-crate implementation for embedding and tests; production
//! deployments can supply a Redis-backed implementation without touching
//! the rest of the crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Errors from the backing key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store backend is unreachable or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An increment was attempted on a non-numeric value.
    #[error("non-numeric counter value for key {0}")]
    NonNumeric(String),
}

/// A TTL-aware key-value store with atomic counters.
///
/// Every key is independently TTL-bound. Implementations must make
/// [`increment`](KvStore::increment) atomic with respect to concurrent
/// callers — the rate limiter's admission guarantee depends on it.
pub trait KvStore: Send + Sync {
    /// Fetch the value for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, expiring after `ttl_secs`.
    fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Remove `key` if present. Removing an absent key is not an error.
    fn forget(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increment the counter at `key` by one and return the new
    /// value. A key created by this call (or found expired) starts from 0
    /// and has its TTL armed to `ttl_secs`; an existing live counter keeps
    /// its remaining TTL.
    fn increment(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError>;
}

/// Entry in the in-memory store: value plus absolute expiry.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory [`KvStore`] with lazy expiry.
///
/// Expired entries are dropped on access rather than by a sweeper; fine
/// for the bounded key population this crate produces (a handful of
/// counter buckets per store plus one entry per cached search).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    fn increment(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        let current = match entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                let parsed: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| StoreError::NonNumeric(key.to_string()))?;
                Some((parsed, entry.expires_at))
            }
            _ => None,
        };

        let (next, expires_at) = match current {
            Some((count, expires_at)) => (count + 1, expires_at),
            None => (1, now + Duration::from_secs(ttl_secs)),
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}
