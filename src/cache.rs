//! Result cache keyed by normalised (query, country) pairs.
//!
//! Caches the final price-sorted listing set in the shared [`KvStore`]
//! as JSON, keyed by a deterministic hash of the lowercased query and
//! uppercased country code. Entries are written wholesale on each
//! successful search and evicted either by TTL or explicitly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::storage::{KvStore, StoreError};
use crate::types::Listing;

const KEY_PREFIX: &str = "external_search";

/// Deterministic cache key for a (query, country) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key from a query and country code.
    ///
    /// The query is lowercased and trimmed, the country uppercased, so
    /// `("Laptop", "us")` and `("laptop", "US")` share an entry.
    pub fn new(query: &str, country_code: &str) -> Self {
        let normalised = format!(
            "{}:{}",
            query.trim().to_lowercase(),
            country_code.trim().to_uppercase()
        );
        let mut hasher = DefaultHasher::new();
        normalised.hash(&mut hasher);
        Self(format!("{KEY_PREFIX}:{:016x}", hasher.finish()))
    }

    /// The underlying store key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Look up cached listings for the given key.
///
/// Returns `Ok(None)` on a miss. An entry that fails to decode is treated
/// as a miss (and logged) rather than an error, so a corrupt payload
/// cannot wedge a query.
///
/// # Errors
///
/// Propagates [`StoreError`] if the backing store is unreachable.
pub fn get(store: &dyn KvStore, key: &CacheKey) -> Result<Option<Vec<Listing>>, StoreError> {
    let Some(payload) = store.get(key.as_str())? else {
        return Ok(None);
    };
    match serde_json::from_str(&payload) {
        Ok(listings) => Ok(Some(listings)),
        Err(err) => {
            tracing::warn!(key = key.as_str(), error = %err, "discarding corrupt cache entry");
            store.forget(key.as_str())?;
            Ok(None)
        }
    }
}

/// Insert listings into the cache, overwriting any previous entry.
///
/// # Errors
///
/// Propagates [`StoreError`] if the backing store is unreachable.
pub fn insert(
    store: &dyn KvStore,
    key: &CacheKey,
    listings: &[Listing],
    ttl_secs: u64,
) -> Result<(), StoreError> {
    let payload = serde_json::to_string(listings)
        .map_err(|err| StoreError::Unavailable(format!("cache encode failed: {err}")))?;
    store.put(key.as_str(), &payload, ttl_secs)
}

/// Evict the one entry for the given key.
///
/// # Errors
///
/// Propagates [`StoreError`] if the backing store is unreachable.
pub fn forget(store: &dyn KvStore, key: &CacheKey) -> Result<(), StoreError> {
    store.forget(key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn make_listing(name: &str, price: f64) -> Listing {
        Listing {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            price,
            currency: "USD".into(),
            availability: "In Stock".into(),
            store_name: "Amazon".into(),
            store_logo_url: "/images/stores/amazon.png".into(),
        }
    }

    #[test]
    fn key_deterministic_for_same_inputs() {
        assert_eq!(CacheKey::new("laptop", "US"), CacheKey::new("laptop", "US"));
    }

    #[test]
    fn key_normalises_query_case_and_whitespace() {
        assert_eq!(
            CacheKey::new("  LAPTOP ", "US"),
            CacheKey::new("laptop", "US")
        );
    }

    #[test]
    fn key_normalises_country_case() {
        assert_eq!(CacheKey::new("laptop", "us"), CacheKey::new("laptop", "US"));
    }

    #[test]
    fn key_differs_when_query_differs() {
        assert_ne!(CacheKey::new("laptop", "US"), CacheKey::new("phone", "US"));
    }

    #[test]
    fn key_differs_when_country_differs() {
        assert_ne!(CacheKey::new("laptop", "US"), CacheKey::new("laptop", "GB"));
    }

    #[test]
    fn miss_returns_none() {
        let store = MemoryStore::new();
        let key = CacheKey::new("nonexistent", "US");
        assert!(get(&store, &key).expect("get").is_none());
    }

    #[test]
    fn insert_and_retrieve() {
        let store = MemoryStore::new();
        let key = CacheKey::new("laptop", "US");
        let listings = vec![make_listing("cheap", 10.0), make_listing("dear", 99.0)];

        insert(&store, &key, &listings, 3600).expect("insert");

        let cached = get(&store, &key).expect("get").expect("should be cached");
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].name, "cheap");
        assert_eq!(cached[1].name, "dear");
    }

    #[test]
    fn insert_overwrites_wholesale() {
        let store = MemoryStore::new();
        let key = CacheKey::new("laptop", "US");

        insert(&store, &key, &[make_listing("old", 1.0)], 3600).expect("insert");
        insert(&store, &key, &[make_listing("new", 2.0)], 3600).expect("insert");

        let cached = get(&store, &key).expect("get").expect("cached");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "new");
    }

    #[test]
    fn forget_evicts_entry() {
        let store = MemoryStore::new();
        let key = CacheKey::new("laptop", "US");

        insert(&store, &key, &[make_listing("x", 1.0)], 3600).expect("insert");
        forget(&store, &key).expect("forget");
        assert!(get(&store, &key).expect("get").is_none());
    }

    #[test]
    fn empty_list_is_a_valid_entry() {
        let store = MemoryStore::new();
        let key = CacheKey::new("no results", "US");

        insert(&store, &key, &[], 3600).expect("insert");
        let cached = get(&store, &key).expect("get").expect("cached");
        assert!(cached.is_empty());
    }

    #[test]
    fn corrupt_payload_treated_as_miss_and_evicted() {
        let store = MemoryStore::new();
        let key = CacheKey::new("laptop", "US");
        store.put(key.as_str(), "{not json", 3600).expect("put");

        assert!(get(&store, &key).expect("get").is_none());
        // The corrupt entry was dropped.
        assert!(store.get(key.as_str()).expect("get").is_none());
    }
}
