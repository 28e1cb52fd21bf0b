//! Per-store admission control across three concurrent time windows.
//!
//! Each store has independent minute/hour/day counters kept in the shared
//! [`KvStore`]. Buckets are calendar-aligned (the current epoch minute,
//! hour, and day), not rolling windows: a counter lives under a key naming
//! its bucket and self-expires after the window length. Simpler and
//! stateless beyond counter+TTL, at the cost of allowing a double-rate
//! burst exactly at a bucket boundary — accepted for a courtesy limiter.
//!
//! Admission for actual scrapes goes through [`RateLimiter::try_acquire`],
//! a single increment-then-compare per window on the store's atomic
//! increment, so concurrent callers can never be *granted* more than the
//! configured quota. The split [`is_allowed`](RateLimiter::is_allowed) /
//! [`record_request`](RateLimiter::record_request) pair remains available
//! for observers and non-concurrent callers.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::SearchConfig;
use crate::storage::KvStore;

const KEY_PREFIX: &str = "rate_limit";

/// The three admission-control windows, each with its own bucket and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Minute,
    Hour,
    Day,
}

impl Window {
    /// All windows, checked in ascending length order.
    pub fn all() -> &'static [Window] {
        &[Self::Minute, Self::Hour, Self::Day]
    }

    /// Window length in seconds; doubles as the counter TTL.
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3600,
            Self::Day => 86400,
        }
    }

    /// Label used in counter keys and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Current calendar-aligned bucket number for this window.
    fn bucket(&self, epoch_secs: u64) -> u64 {
        epoch_secs / self.seconds()
    }
}

/// Remaining quota per window, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub minute: u32,
    pub hour: u32,
    pub day: u32,
}

/// Three-window rate limiter over a shared counter store.
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    config: SearchConfig,
}

impl RateLimiter {
    /// Create a rate limiter over the given counter store and config.
    pub fn new(store: Arc<dyn KvStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Check whether a request to `store_id` is currently permitted.
    ///
    /// Pure read, no side effects. Returns `false` if any window's counter
    /// has already reached its limit. If the counter store is unreachable,
    /// counts are treated as 0 (fail open) and a warning is logged.
    pub fn is_allowed(&self, store_id: &str) -> bool {
        let limits = self.config.limits_for(store_id);
        let now = epoch_secs();

        for window in Window::all() {
            let count = self.read_count(store_id, *window, now);
            if count >= i64::from(self.limit_for(*window, &limits)) {
                return false;
            }
        }
        true
    }

    /// Record one consumed request for `store_id` in all three windows.
    ///
    /// Must be called exactly once per attempted scrape, after
    /// [`is_allowed`](Self::is_allowed) returned `true`. Counter-store
    /// failures are logged and otherwise ignored (best effort).
    pub fn record_request(&self, store_id: &str) {
        let now = epoch_secs();
        for window in Window::all() {
            let key = self.key(store_id, *window, now);
            if let Err(err) = self.store.increment(&key, window.seconds()) {
                tracing::warn!(store = store_id, window = window.label(), error = %err,
                    "failed to record rate-limit request");
            }
        }
    }

    /// Atomically consume one unit of quota for `store_id`.
    ///
    /// Increments each window's counter and compares the returned value
    /// against the limit in one step, so two concurrent callers cannot both
    /// be granted the last slot. A denied window leaves its counter
    /// inflated (counters are never decremented); the guarantee is that
    /// grants never exceed the limit within a bucket.
    ///
    /// Counter-store failures fail open with a warning, like
    /// [`is_allowed`](Self::is_allowed).
    pub fn try_acquire(&self, store_id: &str) -> bool {
        let limits = self.config.limits_for(store_id);
        let now = epoch_secs();
        let mut granted = true;

        for window in Window::all() {
            let key = self.key(store_id, *window, now);
            match self.store.increment(&key, window.seconds()) {
                Ok(count) => {
                    if count > i64::from(self.limit_for(*window, &limits)) {
                        granted = false;
                    }
                }
                Err(err) => {
                    tracing::warn!(store = store_id, window = window.label(), error = %err,
                        "counter store unreachable, failing open");
                }
            }
        }
        granted
    }

    /// Remaining quota per window: `max(0, limit - count)`.
    pub fn remaining_requests(&self, store_id: &str) -> Remaining {
        let limits = self.config.limits_for(store_id);
        let now = epoch_secs();

        let remaining = |window: Window, limit: u32| -> u32 {
            let count = self.read_count(store_id, window, now);
            u32::try_from(i64::from(limit).saturating_sub(count).max(0)).unwrap_or(0)
        };

        Remaining {
            minute: remaining(Window::Minute, limits.requests_per_minute),
            hour: remaining(Window::Hour, limits.requests_per_hour),
            day: remaining(Window::Day, limits.requests_per_day),
        }
    }

    /// Best-effort clear of the *current* bucket keys for `store_id`.
    ///
    /// History already rolled into prior expired buckets is untouched.
    /// Intended for tests and administration.
    pub fn reset(&self, store_id: &str) {
        let now = epoch_secs();
        for window in Window::all() {
            let key = self.key(store_id, *window, now);
            if let Err(err) = self.store.forget(&key) {
                tracing::warn!(store = store_id, window = window.label(), error = %err,
                    "failed to reset rate-limit counter");
            }
        }
    }

    fn key(&self, store_id: &str, window: Window, epoch_secs: u64) -> String {
        format!(
            "{KEY_PREFIX}:{store_id}:{}:{}",
            window.label(),
            window.bucket(epoch_secs)
        )
    }

    fn limit_for(&self, window: Window, limits: &crate::config::RateLimitProfile) -> u32 {
        match window {
            Window::Minute => limits.requests_per_minute,
            Window::Hour => limits.requests_per_hour,
            Window::Day => limits.requests_per_day,
        }
    }

    /// Read a window counter, treating absence and store errors as 0.
    fn read_count(&self, store_id: &str, window: Window, epoch_secs: u64) -> i64 {
        let key = self.key(store_id, window, epoch_secs);
        match self.store.get(&key) {
            Ok(Some(value)) => value.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(err) => {
                tracing::warn!(store = store_id, window = window.label(), error = %err,
                    "counter store unreachable, treating count as 0");
                0
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
