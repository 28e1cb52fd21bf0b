//! Core types for store listings and store identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single normalized product listing returned by a store adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Product name as shown on the store's search page.
    pub name: String,
    /// Absolute URL of the product page.
    pub url: String,
    /// Listed price. `0.0` means the price could not be extracted;
    /// such listings sort first in the aggregated result.
    pub price: f64,
    /// ISO 4217 currency code for `price` (e.g. "USD", "GBP").
    pub currency: String,
    /// Availability text, e.g. "In Stock" or "Unknown".
    pub availability: String,
    /// Human-readable store name (e.g. "Amazon").
    pub store_name: String,
    /// URL of the store's logo asset.
    pub store_logo_url: String,
}

/// Supported external stores that pricescout can scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Store {
    /// Amazon — regional marketplaces in ten countries.
    Amazon,
    /// eBay — regional marketplaces in eight countries.
    Ebay,
}

impl Store {
    /// Returns the lowercase identifier used for rate-limit keys and config lookup.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Ebay => "ebay",
        }
    }

    /// Returns the human-readable store name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Ebay => "eBay",
        }
    }

    /// Returns all supported store variants, in resolution order.
    ///
    /// The orchestrator attempts stores strictly in this order.
    pub fn all() -> &'static [Store] {
        &[Self::Amazon, Self::Ebay]
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
