//! Contract for pluggable store adapters and their per-country factory.
//!
//! Each supported store (Amazon, eBay) implements [`StoreAdapter`] to
//! translate a free-text query into normalized [`Listing`] records for
//! exactly one external store. Instances are constructed fresh per search
//! per (store, country) pair through an [`AdapterFactory`] — never pooled
//! or reused across calls, since the country selects the regional domain.

use async_trait::async_trait;

use crate::adapters::{AmazonAdapter, EbayAdapter};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{Listing, Store};

/// A pluggable store scraping backend.
///
/// Implementors handle their own URL construction, HTTP requests, retry
/// within a request, and HTML parsing. They do **not** recover from
/// scrape-level failures: a connection-class error surfaces as
/// [`SearchError::Connection`] and anything else as another variant, so
/// the orchestrator can log and isolate them differently.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Which [`Store`] variant this adapter represents.
    fn store(&self) -> Store;

    /// Lowercase store identifier used for rate-limit keys.
    fn store_identifier(&self) -> &'static str {
        self.store().identifier()
    }

    /// Whether this adapter serves the given country.
    ///
    /// A `false` here means silent exclusion from the search — not an
    /// error, and no rate-limit quota is consumed.
    fn is_available_for_country(&self, country_code: &str) -> bool;

    /// Scrape the store's search page for `query` and return normalized
    /// listings.
    ///
    /// # Errors
    ///
    /// [`SearchError::Connection`] for network/timeout failures,
    /// [`SearchError::Http`] or [`SearchError::Parse`] otherwise.
    async fn scrape(&self, query: &str) -> Result<Vec<Listing>, SearchError>;
}

/// Builds adapters keyed by (store, country).
///
/// The orchestrator resolves its adapter set through this seam, which is
/// also where tests substitute mock adapters.
pub trait AdapterFactory: Send + Sync {
    /// Construct a fresh adapter for `store` targeting `country_code`.
    fn build(&self, store: Store, country_code: &str) -> Box<dyn StoreAdapter>;
}

/// Factory producing the real scraping adapters.
pub struct ScrapingAdapterFactory {
    config: SearchConfig,
}

impl ScrapingAdapterFactory {
    /// Create a factory that passes `config` (timeouts, retry, UA) to
    /// every adapter it builds.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

impl AdapterFactory for ScrapingAdapterFactory {
    fn build(&self, store: Store, country_code: &str) -> Box<dyn StoreAdapter> {
        match store {
            Store::Amazon => Box::new(AmazonAdapter::new(country_code, self.config.clone())),
            Store::Ebay => Box::new(EbayAdapter::new(country_code, self.config.clone())),
        }
    }
}
