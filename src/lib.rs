//! # pricescout
//!
//! Multi-store external price search for product queries.
//!
//! Given a free-text query and a country code, pricescout scrapes the
//! search pages of each store serving that country, merges the listings,
//! sorts them cheapest-first, and caches the aggregate. It compiles into
//! the host application as a library dependency — no network listeners.
//!
//! ## Design
//!
//! - One adapter per store (Amazon, eBay), built fresh per search for the
//!   country's regional marketplace domain
//! - Sequential scraping with inter-store pacing to stay polite
//! - Per-store admission control across minute/hour/day windows, backed by
//!   a pluggable TTL key-value store ([`MemoryStore`] in-process, or bring
//!   your own Redis-backed [`storage::KvStore`])
//! - Per-adapter fault isolation: one broken store never sinks a search
//! - Enforced per-scrape deadline and single-flight deduplication of
//!   concurrent identical queries
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> pricescout::Result<()> {
//! use std::sync::Arc;
//! use pricescout::{MemoryStore, SearchConfig, SearchOrchestrator};
//!
//! let orchestrator = SearchOrchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     SearchConfig::default(),
//! );
//! let listings = orchestrator.search("gaming laptop", "US").await?;
//! for listing in &listings {
//!     println!("{} {} — {}", listing.price, listing.currency, listing.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod rate_limiter;
pub mod storage;
pub mod types;

pub use adapter::{AdapterFactory, ScrapingAdapterFactory, StoreAdapter};
pub use config::{RateLimitProfile, RetryConfig, SearchConfig};
pub use error::{Result, SearchError};
pub use orchestrator::{SearchOrchestrator, DEFAULT_COUNTRY};
pub use rate_limiter::{RateLimiter, Remaining};
pub use storage::{KvStore, MemoryStore, StoreError};
pub use types::{Listing, Store};
