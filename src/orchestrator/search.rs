//! Search orchestrator: cached, paced, rate-gated multi-store scraping.
//!
//! One end-to-end search runs the pipeline: cache lookup → resolve adapters
//! for the country → sequential scrape loop with inter-store pacing, atomic
//! rate gating, and an enforced per-adapter deadline → stable price sort →
//! cache write. No adapter-level failure of any kind escapes
//! [`SearchOrchestrator::search`]; only failures of the orchestrator's own
//! result store propagate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{AdapterFactory, ScrapingAdapterFactory, StoreAdapter};
use crate::cache::{self, CacheKey};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::rate_limiter::RateLimiter;
use crate::storage::KvStore;
use crate::types::{Listing, Store};

use super::flight::FlightGuards;

/// Country used when the caller does not specify one.
pub const DEFAULT_COUNTRY: &str = "US";

/// Orchestrates multi-store price searches over a shared key-value store.
pub struct SearchOrchestrator {
    store: Arc<dyn KvStore>,
    config: SearchConfig,
    rate_limiter: RateLimiter,
    factory: Arc<dyn AdapterFactory>,
    flights: FlightGuards,
    /// Statically pre-registered adapters. Empty by design: adapters are
    /// built per call per country through the factory. Kept for future
    /// pre-registration use.
    registered: Vec<Store>,
}

impl SearchOrchestrator {
    /// Create an orchestrator with the real scraping adapters.
    pub fn new(store: Arc<dyn KvStore>, config: SearchConfig) -> Self {
        let factory = Arc::new(ScrapingAdapterFactory::new(config.clone()));
        Self::with_factory(store, config, factory)
    }

    /// Create an orchestrator with a custom adapter factory.
    ///
    /// This is the seam tests use to substitute mock adapters.
    pub fn with_factory(
        store: Arc<dyn KvStore>,
        config: SearchConfig,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(Arc::clone(&store), config.clone());
        Self {
            store,
            config,
            rate_limiter,
            factory,
            flights: FlightGuards::new(),
            registered: Vec::new(),
        }
    }

    /// Search all available stores for `query` in `country_code`.
    ///
    /// Returns the aggregated listings sorted ascending by price (missing
    /// prices sort first); ties keep their scrape order. An empty list is
    /// a valid outcome — no stores for the country, every adapter skipped
    /// or failed, or genuinely no matches.
    ///
    /// # Errors
    ///
    /// Only [`SearchError::Config`] (invalid configuration) or
    /// [`SearchError::Store`] (the result store itself unreachable) — never
    /// an error attributable to a store adapter.
    pub async fn search(&self, query: &str, country_code: &str) -> Result<Vec<Listing>, SearchError> {
        self.config.validate()?;

        let key = CacheKey::new(query, country_code);
        if let Some(cached) = cache::get(self.store.as_ref(), &key)? {
            tracing::debug!(query, country = country_code, count = cached.len(),
                "returning cached search results");
            return Ok(cached);
        }

        // Single-flight: one computation per key, everyone else waits and
        // then hits the warm cache.
        let guard = self.flights.guard_for(key.as_str());
        let _held = guard.lock().await;

        if let Some(cached) = cache::get(self.store.as_ref(), &key)? {
            tracing::debug!(query, country = country_code, count = cached.len(),
                "returning results cached by concurrent search");
            self.flights.finish(key.as_str());
            return Ok(cached);
        }

        let outcome = self.scrape_all(query, country_code, &key).await;
        self.flights.finish(key.as_str());
        outcome
    }

    /// [`search`](Self::search) with the default country.
    pub async fn search_default(&self, query: &str) -> Result<Vec<Listing>, SearchError> {
        self.search(query, DEFAULT_COUNTRY).await
    }

    /// Evict the one cache entry for this (query, country) pair.
    ///
    /// The next search for the pair re-scrapes.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the result store is unreachable.
    pub fn clear_cache(&self, query: &str, country_code: &str) -> Result<(), SearchError> {
        let key = CacheKey::new(query, country_code);
        cache::forget(self.store.as_ref(), &key)?;
        Ok(())
    }

    /// The statically registered adapter list. Empty by design, since
    /// adapters are built per call; informational only.
    pub fn adapters(&self) -> &[Store] {
        &self.registered
    }

    /// Observability passthrough: remaining quota for a store.
    pub fn remaining_requests(&self, store_id: &str) -> crate::rate_limiter::Remaining {
        self.rate_limiter.remaining_requests(store_id)
    }

    /// Build the adapters serving `country_code`, in resolution order.
    fn resolve_adapters(&self, country_code: &str) -> Vec<Box<dyn StoreAdapter>> {
        Store::all()
            .iter()
            .map(|store| self.factory.build(*store, country_code))
            .filter(|adapter| adapter.is_available_for_country(country_code))
            .collect()
    }

    async fn scrape_all(
        &self,
        query: &str,
        country_code: &str,
        key: &CacheKey,
    ) -> Result<Vec<Listing>, SearchError> {
        let adapters = self.resolve_adapters(country_code);
        if adapters.is_empty() {
            tracing::warn!(country = country_code, "no store adapters available for country");
            return Ok(Vec::new());
        }

        let deadline = Duration::from_secs(self.config.scrape_deadline_secs);
        let mut all_listings: Vec<Listing> = Vec::new();

        for (index, adapter) in adapters.iter().enumerate() {
            let store_id = adapter.store_identifier();

            // Pacing between stores, independent of the rate limiter.
            if index > 0 {
                tokio::time::sleep(Duration::from_secs(self.config.delay_between_stores_secs))
                    .await;
            }

            // Atomic admission: quota is consumed here, before the scrape,
            // so a broken store cannot be hammered within one window.
            if !self.rate_limiter.try_acquire(store_id) {
                let remaining = self.rate_limiter.remaining_requests(store_id);
                tracing::warn!(adapter = store_id, query, ?remaining,
                    "rate limit exceeded, skipping adapter");
                continue;
            }

            tracing::debug!(adapter = store_id, query, "scraping store");
            let started = Instant::now();

            match tokio::time::timeout(deadline, adapter.scrape(query)).await {
                Ok(Ok(listings)) => {
                    tracing::debug!(adapter = store_id, count = listings.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "adapter scrape completed");
                    all_listings.extend(listings);
                }
                Ok(Err(SearchError::Connection(msg))) => {
                    tracing::warn!(adapter = store_id, query, error = %msg,
                        "adapter connection failed");
                }
                Ok(Err(err)) => {
                    tracing::error!(adapter = store_id, query, error = %err,
                        "adapter scrape failed");
                }
                Err(_) => {
                    tracing::warn!(adapter = store_id, query,
                        deadline_secs = self.config.scrape_deadline_secs,
                        "adapter scrape exceeded deadline, cancelled");
                }
            }
        }

        sort_by_price(&mut all_listings);
        cache::insert(
            self.store.as_ref(),
            key,
            &all_listings,
            self.config.cache_ttl_secs,
        )?;

        Ok(all_listings)
    }
}

/// Stable ascending price sort; a missing price counts as 0.0 and sorts
/// first, ties keep their scrape order.
fn sort_by_price(listings: &mut [Listing]) {
    listings.sort_by(|a, b| {
        let pa = if a.price.is_finite() { a.price } else { 0.0 };
        let pb = if b.price.is_finite() { b.price } else { 0.0 };
        pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn make_listing(name: &str, store: &str, price: f64) -> Listing {
        Listing {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            price,
            currency: "USD".into(),
            availability: "In Stock".into(),
            store_name: store.to_string(),
            store_logo_url: String::new(),
        }
    }

    #[test]
    fn sort_ascending_by_price() {
        let mut listings = vec![
            make_listing("a", "Amazon", 999.99),
            make_listing("b", "eBay", 899.50),
            make_listing("c", "Amazon", 24.50),
        ];
        sort_by_price(&mut listings);
        assert_eq!(listings[0].name, "c");
        assert_eq!(listings[1].name, "b");
        assert_eq!(listings[2].name, "a");
    }

    #[test]
    fn missing_price_sorts_first() {
        let mut listings = vec![
            make_listing("priced", "Amazon", 10.0),
            make_listing("unpriced", "eBay", 0.0),
        ];
        sort_by_price(&mut listings);
        assert_eq!(listings[0].name, "unpriced");
    }

    #[test]
    fn equal_prices_keep_scrape_order() {
        let mut listings = vec![
            make_listing("first", "Amazon", 5.0),
            make_listing("second", "eBay", 5.0),
            make_listing("third", "eBay", 5.0),
        ];
        sort_by_price(&mut listings);
        assert_eq!(listings[0].name, "first");
        assert_eq!(listings[1].name, "second");
        assert_eq!(listings[2].name, "third");
    }

    #[test]
    fn non_finite_price_treated_as_zero() {
        let mut listings = vec![
            make_listing("priced", "Amazon", 10.0),
            make_listing("nan", "eBay", f64::NAN),
        ];
        sort_by_price(&mut listings);
        assert_eq!(listings[0].name, "nan");
    }

    #[test]
    fn resolve_adapters_for_us_finds_both_stores() {
        let orchestrator =
            SearchOrchestrator::new(Arc::new(MemoryStore::new()), SearchConfig::default());
        let adapters = orchestrator.resolve_adapters("US");
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].store(), Store::Amazon);
        assert_eq!(adapters[1].store(), Store::Ebay);
    }

    #[test]
    fn resolve_adapters_filters_unserved_stores() {
        let orchestrator =
            SearchOrchestrator::new(Arc::new(MemoryStore::new()), SearchConfig::default());
        // Amazon serves Japan, eBay does not.
        let adapters = orchestrator.resolve_adapters("JP");
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].store(), Store::Amazon);
    }

    #[test]
    fn resolve_adapters_unknown_country_is_empty() {
        let orchestrator =
            SearchOrchestrator::new(Arc::new(MemoryStore::new()), SearchConfig::default());
        assert!(orchestrator.resolve_adapters("EG").is_empty());
    }

    #[test]
    fn registered_adapter_list_is_empty_by_design() {
        let orchestrator =
            SearchOrchestrator::new(Arc::new(MemoryStore::new()), SearchConfig::default());
        assert!(orchestrator.adapters().is_empty());
    }

    #[tokio::test]
    async fn invalid_config_rejected_at_search() {
        let config = SearchConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        };
        let orchestrator = SearchOrchestrator::new(Arc::new(MemoryStore::new()), config);
        let err = orchestrator.search("laptop", "US").await.unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[tokio::test]
    async fn unknown_country_returns_empty_list() {
        let orchestrator =
            SearchOrchestrator::new(Arc::new(MemoryStore::new()), SearchConfig::default());
        let listings = orchestrator.search("laptop", "EG").await.expect("search");
        assert!(listings.is_empty());
    }
}
