//! Per-cache-key single-flight guards.
//!
//! Concurrent searches for the same (query, country) pair serialize on a
//! shared async mutex: the first caller scrapes and fills the cache, the
//! rest wake up, re-check the cache, and return the warm entry without
//! issuing duplicate store requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry of in-flight search computations, keyed by cache key.
#[derive(Debug, Default)]
pub struct FlightGuards {
    guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FlightGuards {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the guard for `key`.
    ///
    /// The caller must hold the returned mutex for the duration of its
    /// computation and call [`finish`](Self::finish) afterwards.
    pub fn guard_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = self
            .guards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guards.entry(key.to_string()).or_default().clone()
    }

    /// Drop the registry entry for `key`.
    ///
    /// Waiters already queued on the guard keep their `Arc` and drain in
    /// order; a caller arriving after removal gets a fresh guard and finds
    /// the cache warm. Keeps the map from growing with one entry per
    /// distinct query ever seen.
    pub fn finish(&self, key: &str) {
        let mut guards = self
            .guards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guards.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_a_guard() {
        let flights = FlightGuards::new();
        let a = flights.guard_for("k1");
        let b = flights.guard_for("k1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_keys_get_distinct_guards() {
        let flights = FlightGuards::new();
        let a = flights.guard_for("k1");
        let b = flights.guard_for("k2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn finish_drops_the_entry() {
        let flights = FlightGuards::new();
        let a = flights.guard_for("k1");
        flights.finish("k1");
        let b = flights.guard_for("k1");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn finish_unknown_key_is_harmless() {
        let flights = FlightGuards::new();
        flights.finish("never-seen");
    }

    #[tokio::test]
    async fn second_holder_waits_for_first() {
        let flights = Arc::new(FlightGuards::new());
        let guard = flights.guard_for("k1");
        let held = guard.lock().await;

        let contender = flights.guard_for("k1");
        assert!(contender.try_lock().is_err());

        drop(held);
        assert!(contender.try_lock().is_ok());
    }
}
