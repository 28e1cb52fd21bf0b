//! Amazon store adapter — regional marketplaces in ten countries.
//!
//! Scrapes the public search page of the country's marketplace domain.
//! For production volume the Product Advertising API with credentials is
//! the better integration; this adapter needs no keys.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::adapter::StoreAdapter;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{Listing, Store};

const LOGO_URL: &str = "/images/stores/amazon.png";

/// Upper bound for a parsed price to be considered plausible.
const MAX_SANE_PRICE: f64 = 1_000_000.0;

/// Amazon search page scraper for one (country, marketplace) pairing.
pub struct AmazonAdapter {
    domain: &'static str,
    currency: &'static str,
    config: SearchConfig,
}

impl AmazonAdapter {
    /// Build an adapter targeting the marketplace for `country_code`.
    ///
    /// Unknown countries fall back to the US marketplace; whether the
    /// adapter actually serves the country is reported separately by
    /// [`is_available_for_country`](StoreAdapter::is_available_for_country).
    pub fn new(country_code: &str, config: SearchConfig) -> Self {
        let domain = marketplace_domain(country_code);
        Self {
            domain,
            currency: currency_for_domain(domain),
            config,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, SearchError> {
        let mut url = Url::parse(&format!("https://www.{}/s", self.domain))
            .map_err(|e| SearchError::Parse(format!("Amazon search URL: {e}")))?;
        url.query_pairs_mut().append_pair("k", query);
        Ok(url)
    }

    async fn fetch(&self, url: &Url) -> Result<String, SearchError> {
        let client = http::build_client(&self.config)?;
        let retry = self.config.retry;
        let mut last_err = SearchError::Http("Amazon request not attempted".into());

        for attempt in 1..=retry.max_attempts {
            let outcome = client
                .get(url.clone())
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.5")
                .send()
                .await;

            match outcome {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .map_err(|e| http::classify_error("Amazon response read failed", &e));
                }
                Ok(response) => {
                    last_err =
                        SearchError::Http(format!("Amazon returned status {}", response.status()));
                    tracing::warn!(attempt, status = %response.status(), "Amazon request failed");
                }
                Err(err) => {
                    let classified = http::classify_error("Amazon request failed", &err);
                    // Only connection-class failures are worth retrying.
                    let transient = matches!(classified, SearchError::Connection(_));
                    last_err = classified;
                    if !transient {
                        return Err(last_err);
                    }
                    tracing::warn!(attempt, error = %last_err, "Amazon connection failed");
                }
            }

            if attempt < retry.max_attempts {
                tokio::time::sleep(std::time::Duration::from_secs(retry.delay_secs)).await;
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl StoreAdapter for AmazonAdapter {
    fn store(&self) -> Store {
        Store::Amazon
    }

    fn is_available_for_country(&self, country_code: &str) -> bool {
        const SUPPORTED: &[&str] = &["US", "GB", "CA", "DE", "FR", "IT", "ES", "JP", "AU", "IN"];
        SUPPORTED.contains(&country_code.to_uppercase().as_str())
    }

    async fn scrape(&self, query: &str) -> Result<Vec<Listing>, SearchError> {
        let url = self.search_url(query)?;
        tracing::trace!(query, url = %url, "scraping Amazon");

        let html = self.fetch(&url).await?;
        tracing::trace!(bytes = html.len(), "Amazon response received");

        let listings = parse_amazon_html(&html, self.domain, self.currency)?;
        tracing::debug!(query, count = listings.len(), "Amazon listings parsed");
        Ok(listings)
    }
}

/// Parse an Amazon search results page into listings.
///
/// Works through a cascade of result-container selectors (layouts vary by
/// marketplace and experiment bucket) and stops at the first selector that
/// yields listings. Items missing a name, URL, or plausible price are
/// skipped rather than failing the page.
pub(crate) fn parse_amazon_html(
    html: &str,
    domain: &str,
    currency: &str,
) -> Result<Vec<Listing>, SearchError> {
    let document = Html::parse_document(html);

    let container_selectors = [
        r#"div[data-component-type="s-search-result"]"#,
        ".s-result-item",
        "div[data-asin]",
    ];

    for raw in container_selectors {
        let container = Selector::parse(raw)
            .map_err(|e| SearchError::Parse(format!("invalid Amazon selector: {e:?}")))?;

        let mut listings = Vec::new();
        for element in document.select(&container) {
            let Some(name) = extract_name(&element) else {
                continue;
            };
            let Some(href) = extract_product_href(&element) else {
                continue;
            };
            let price = extract_price(&element);
            if price <= 0.0 {
                continue;
            }

            listings.push(Listing {
                name,
                url: normalize_url(&href, domain),
                price,
                currency: currency.to_string(),
                availability: extract_availability(&element),
                store_name: Store::Amazon.name().to_string(),
                store_logo_url: LOGO_URL.to_string(),
            });
        }

        if !listings.is_empty() {
            return Ok(listings);
        }
    }

    Ok(Vec::new())
}

fn extract_name(element: &ElementRef<'_>) -> Option<String> {
    // Ordered by reliability across Amazon layouts.
    const SELECTORS: &[&str] = &["h2 a span", "h2 a", "h2 span", "a.a-link-normal span"];
    const NON_PRODUCT: &[&str] = &["sponsored", "ad", "best seller", "new"];

    for raw in SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(node) = element.select(&selector).next() {
            let name = node.text().collect::<String>().trim().to_string();
            if name.len() > 3 && !NON_PRODUCT.contains(&name.to_lowercase().as_str()) {
                return Some(name);
            }
        }
    }
    None
}

fn extract_product_href(element: &ElementRef<'_>) -> Option<String> {
    const SELECTORS: &[&str] = &[
        "h2 a",
        "a.a-link-normal",
        r#"a[href*="/dp/"]"#,
        r#"a[href*="/gp/product/"]"#,
    ];

    for raw in SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for node in element.select(&selector) {
            if let Some(href) = node.value().attr("href") {
                if href.contains("/dp/") || href.contains("/gp/product/") {
                    return Some(href.to_string());
                }
            }
        }
    }
    None
}

fn extract_price(element: &ElementRef<'_>) -> f64 {
    const SELECTORS: &[&str] = &[
        ".a-price .a-offscreen",
        ".a-price-whole",
        r#"[data-a-color="price"] .a-offscreen"#,
    ];

    for raw in SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(node) = element.select(&selector).next() {
            let price = parse_price(&node.text().collect::<String>());
            if price > 0.0 && price < MAX_SANE_PRICE {
                return price;
            }
        }
    }
    0.0
}

fn extract_availability(element: &ElementRef<'_>) -> String {
    if let Ok(selector) = Selector::parse(".a-color-success") {
        if let Some(node) = element.select(&selector).next() {
            let text = node.text().collect::<String>().to_lowercase();
            if text.contains("stock") || text.contains("available") {
                return "In Stock".to_string();
            }
        }
    }
    // Most Amazon search listings are purchasable.
    "In Stock".to_string()
}

/// Strip currency symbols and thousands separators, keep the decimal point.
pub(crate) fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    cleaned.replace(',', "").parse().unwrap_or(0.0)
}

fn normalize_url(href: &str, domain: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if let Some(path) = href.strip_prefix('/') {
        format!("https://www.{domain}/{path}")
    } else {
        format!("https://www.{domain}/{href}")
    }
}

fn marketplace_domain(country_code: &str) -> &'static str {
    match country_code.to_uppercase().as_str() {
        "GB" => "amazon.co.uk",
        "CA" => "amazon.ca",
        "DE" => "amazon.de",
        "FR" => "amazon.fr",
        "IT" => "amazon.it",
        "ES" => "amazon.es",
        "JP" => "amazon.co.jp",
        "AU" => "amazon.com.au",
        "IN" => "amazon.in",
        _ => "amazon.com",
    }
}

fn currency_for_domain(domain: &str) -> &'static str {
    match domain {
        "amazon.co.uk" => "GBP",
        "amazon.ca" => "CAD",
        "amazon.de" | "amazon.fr" | "amazon.it" | "amazon.es" => "EUR",
        "amazon.co.jp" => "JPY",
        "amazon.com.au" => "AUD",
        "amazon.in" => "INR",
        _ => "USD",
    }
}
