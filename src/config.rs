//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls rate-limit profiles, inter-store pacing,
//! caching, HTTP timeouts, and retry behaviour. The defaults mirror a
//! polite production scraping profile.

use std::collections::HashMap;

use crate::error::SearchError;
use crate::types::Store;

/// Per-store outbound request quota across the three rate-limit windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitProfile {
    /// Maximum requests within the current minute bucket.
    pub requests_per_minute: u32,
    /// Maximum requests within the current hour bucket.
    pub requests_per_hour: u32,
    /// Maximum requests within the current day bucket.
    pub requests_per_day: u32,
}

impl Default for RateLimitProfile {
    fn default() -> Self {
        Self {
            requests_per_minute: 5,
            requests_per_hour: 30,
            requests_per_day: 200,
        }
    }
}

/// HTTP retry behaviour for a single adapter request.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts before giving up (first try included).
    pub max_attempts: u32,
    /// Pause between attempts in seconds.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2,
        }
    }
}

/// Configuration for the search orchestrator and its collaborators.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Rate-limit profiles keyed by lowercase store identifier. Stores
    /// absent from this map fall back to the first configured store's
    /// profile (in [`Store::all`] order), then to the built-in default.
    pub rate_limits: HashMap<String, RateLimitProfile>,
    /// Pause between successive store scrapes within one search, in
    /// seconds. Independent of the rate limiter; reduces the chance of
    /// upstream blocking.
    pub delay_between_stores_secs: u64,
    /// TTL for cached aggregated results, in seconds.
    pub cache_ttl_secs: u64,
    /// Enforced deadline per adapter scrape, in seconds. A scrape that
    /// exceeds it is cancelled and the adapter skipped.
    pub scrape_deadline_secs: u64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Retry behaviour for adapter HTTP requests.
    pub retry: RetryConfig,
    /// Custom User-Agent string. If `None`, rotates through a built-in
    /// list of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut rate_limits = HashMap::new();
        rate_limits.insert("amazon".to_string(), RateLimitProfile::default());
        rate_limits.insert(
            "ebay".to_string(),
            RateLimitProfile {
                requests_per_minute: 10,
                requests_per_hour: 50,
                requests_per_day: 300,
            },
        );

        Self {
            rate_limits,
            delay_between_stores_secs: 2,
            cache_ttl_secs: 3600,
            scrape_deadline_secs: 30,
            request_timeout_secs: 15,
            connect_timeout_secs: 5,
            retry: RetryConfig::default(),
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Resolve the rate-limit profile for a store identifier.
    ///
    /// Unknown identifiers are not an error; they fall back to the
    /// first configured store's profile, then to
    /// [`RateLimitProfile::default`].
    pub fn limits_for(&self, store_id: &str) -> RateLimitProfile {
        if let Some(profile) = self.rate_limits.get(&store_id.to_lowercase()) {
            return *profile;
        }
        Store::all()
            .iter()
            .find_map(|store| self.rate_limits.get(store.identifier()))
            .copied()
            .unwrap_or_default()
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `cache_ttl_secs` must be greater than 0
    /// - `scrape_deadline_secs` must be greater than 0
    /// - `request_timeout_secs` must be greater than 0
    /// - `retry.max_attempts` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cache_ttl_secs == 0 {
            return Err(SearchError::Config(
                "cache_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.scrape_deadline_secs == 0 {
            return Err(SearchError::Config(
                "scrape_deadline_secs must be greater than 0".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SearchError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SearchError::Config(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
