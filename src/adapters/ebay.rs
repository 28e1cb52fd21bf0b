//! eBay store adapter — regional marketplaces in eight countries.
//!
//! Scrapes the public search results page, sorted by price ascending
//! (`_sop=15`) so the cheapest offers come first on the page.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::adapter::StoreAdapter;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{Listing, Store};

use super::amazon::parse_price;

const LOGO_URL: &str = "/images/stores/ebay.png";

const MAX_SANE_PRICE: f64 = 1_000_000.0;

/// eBay search page scraper for one (country, marketplace) pairing.
pub struct EbayAdapter {
    domain: &'static str,
    currency: &'static str,
    config: SearchConfig,
}

impl EbayAdapter {
    /// Build an adapter targeting the marketplace for `country_code`.
    pub fn new(country_code: &str, config: SearchConfig) -> Self {
        let domain = marketplace_domain(country_code);
        Self {
            domain,
            currency: currency_for_domain(domain),
            config,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, SearchError> {
        let mut url = Url::parse(&format!("https://www.{}/sch/i.html", self.domain))
            .map_err(|e| SearchError::Parse(format!("eBay search URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("_nkw", query)
            // Sort by price + shipping, lowest first.
            .append_pair("_sop", "15");
        Ok(url)
    }

    async fn fetch(&self, url: &Url) -> Result<String, SearchError> {
        let client = http::build_client(&self.config)?;
        let retry = self.config.retry;
        let mut last_err = SearchError::Http("eBay request not attempted".into());

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
                        .map_err(|e| http::classify_error("eBay response read failed", &e));
                }
                Ok(response) => {
                    last_err =
                        SearchError::Http(format!("eBay returned status {}", response.status()));
                    tracing::warn!(attempt, status = %response.status(), "eBay request failed");
                }
                Err(err) => {
                    let classified = http::classify_error("eBay request failed", &err);
                    let transient = matches!(classified, SearchError::Connection(_));
                    last_err = classified;
                    if !transient {
                        return Err(last_err);
                    }
                    tracing::warn!(attempt, error = %last_err, "eBay connection failed");
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
impl StoreAdapter for EbayAdapter {
    fn store(&self) -> Store {
        Store::Ebay
    }

    fn is_available_for_country(&self, country_code: &str) -> bool {
        const SUPPORTED: &[&str] = &["US", "GB", "CA", "AU", "DE", "FR", "IT", "ES"];
        SUPPORTED.contains(&country_code.to_uppercase().as_str())
    }

    async fn scrape(&self, query: &str) -> Result<Vec<Listing>, SearchError> {
        let url = self.search_url(query)?;
        tracing::trace!(query, url = %url, "scraping eBay");

        let html = self.fetch(&url).await?;
        tracing::trace!(bytes = html.len(), "eBay response received");

        let listings = parse_ebay_html(&html, self.domain, self.currency)?;
        tracing::debug!(query, count = listings.len(), "eBay listings parsed");
        Ok(listings)
    }
}

/// Parse an eBay search results page into listings.
///
/// eBay occasionally pads the result list with a "Shop on eBay" placeholder
/// item; placeholder and priceless entries are skipped.
pub(crate) fn parse_ebay_html(
    html: &str,
    domain: &str,
    currency: &str,
) -> Result<Vec<Listing>, SearchError> {
    let document = Html::parse_document(html);

    let container = Selector::parse(".s-item")
        .map_err(|e| SearchError::Parse(format!("invalid eBay selector: {e:?}")))?;
    let title_sel = Selector::parse(".s-item__title")
        .map_err(|e| SearchError::Parse(format!("invalid eBay title selector: {e:?}")))?;
    let link_sel = Selector::parse("a.s-item__link")
        .map_err(|e| SearchError::Parse(format!("invalid eBay link selector: {e:?}")))?;
    let price_sel = Selector::parse(".s-item__price")
        .map_err(|e| SearchError::Parse(format!("invalid eBay price selector: {e:?}")))?;

    let mut listings = Vec::new();

    for element in document.select(&container) {
        let Some(name) = extract_title(&element, &title_sel) else {
            continue;
        };
        let Some(href) = element
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let price = element
            .select(&price_sel)
            .next()
            .map(|node| parse_price(&node.text().collect::<String>()))
            .unwrap_or(0.0);
        if price <= 0.0 || price >= MAX_SANE_PRICE {
            continue;
        }

        listings.push(Listing {
            name,
            url: normalize_url(href, domain),
            price,
            currency: currency.to_string(),
            availability: extract_availability(&element),
            store_name: Store::Ebay.name().to_string(),
            store_logo_url: LOGO_URL.to_string(),
        });
    }

    Ok(listings)
}

fn extract_title(element: &ElementRef<'_>, title_sel: &Selector) -> Option<String> {
    let node = element.select(title_sel).next()?;
    let title = node.text().collect::<String>().trim().to_string();
    if title.len() <= 3 || title.eq_ignore_ascii_case("Shop on eBay") {
        return None;
    }
    Some(title)
}

fn extract_availability(element: &ElementRef<'_>) -> String {
    // Listed auctions/offers are buyable unless flagged sold out.
    if let Ok(selector) = Selector::parse(".s-item__info") {
        if let Some(node) = element.select(&selector).next() {
            let text = node.text().collect::<String>().to_lowercase();
            if text.contains("sold out") || text.contains("out of stock") {
                return "Out of Stock".to_string();
            }
        }
    }
    "In Stock".to_string()
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
        "GB" => "ebay.co.uk",
        "CA" => "ebay.ca",
        "AU" => "ebay.com.au",
        "DE" => "ebay.de",
        "FR" => "ebay.fr",
        "IT" => "ebay.it",
        "ES" => "ebay.es",
        _ => "ebay.com",
    }
}

fn currency_for_domain(domain: &str) -> &'static str {
    match domain {
        "ebay.co.uk" => "GBP",
        "ebay.ca" => "CAD",
        "ebay.com.au" => "AUD",
        "ebay.de" | "ebay.fr" | "ebay.it" | "ebay.es" => "EUR",
        _ => "USD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_EBAY_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<ul>
<li class="s-item">
    <div class="s-item__info">
        <a class="s-item__link" href="https://www.ebay.com/itm/111">
            <div class="s-item__title">Refurbished Laptop 14 inch</div>
        </a>
        <span class="s-item__price">$249.99</span>
    </div>
</li>
<li class="s-item">
    <div class="s-item__info">
        <a class="s-item__link" href="https://www.ebay.com/itm/222">
            <div class="s-item__title">Laptop Charger 65W</div>
        </a>
        <span class="s-item__price">$18.00</span>
    </div>
</li>
<li class="s-item">
    <div class="s-item__info">
        <a class="s-item__link" href="https://www.ebay.com/itm/000">
            <div class="s-item__title">Shop on eBay</div>
        </a>
        <span class="s-item__price">$20.00</span>
    </div>
</li>
</ul>
</body>
</html>"#;

    #[test]
    fn parse_mock_html_returns_listings() {
        let listings = parse_ebay_html(MOCK_EBAY_HTML, "ebay.com", "USD").expect("parse");
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].name, "Refurbished Laptop 14 inch");
        assert_eq!(listings[0].url, "https://www.ebay.com/itm/111");
        assert!((listings[0].price - 249.99).abs() < f64::EPSILON);
        assert_eq!(listings[0].store_name, "eBay");
        assert_eq!(listings[0].availability, "In Stock");

        assert!((listings[1].price - 18.00).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_skips_placeholder_item() {
        let listings = parse_ebay_html(MOCK_EBAY_HTML, "ebay.com", "USD").expect("parse");
        assert!(listings.iter().all(|l| l.name != "Shop on eBay"));
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        let listings =
            parse_ebay_html("<html><body></body></html>", "ebay.com", "USD").expect("parse");
        assert!(listings.is_empty());
    }

    #[test]
    fn parse_priceless_item_is_skipped() {
        let html = r#"<li class="s-item">
            <a class="s-item__link" href="https://www.ebay.com/itm/333">
                <div class="s-item__title">Mystery Item No Price</div>
            </a>
        </li>"#;
        let listings = parse_ebay_html(html, "ebay.com", "USD").expect("parse");
        assert!(listings.is_empty());
    }

    #[test]
    fn sold_out_listing_is_flagged() {
        let html = r#"<li class="s-item">
            <div class="s-item__info">
                <a class="s-item__link" href="https://www.ebay.com/itm/444">
                    <div class="s-item__title">Popular Gadget Pro</div>
                </a>
                <span class="s-item__price">$59.99</span>
                <span>Sold out</span>
            </div>
        </li>"#;
        let listings = parse_ebay_html(html, "ebay.com", "USD").expect("parse");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].availability, "Out of Stock");
    }

    #[test]
    fn marketplace_domain_per_country() {
        assert_eq!(marketplace_domain("US"), "ebay.com");
        assert_eq!(marketplace_domain("gb"), "ebay.co.uk");
        assert_eq!(marketplace_domain("AU"), "ebay.com.au");
        assert_eq!(marketplace_domain("JP"), "ebay.com");
    }

    #[test]
    fn currency_follows_domain() {
        assert_eq!(currency_for_domain("ebay.com"), "USD");
        assert_eq!(currency_for_domain("ebay.co.uk"), "GBP");
        assert_eq!(currency_for_domain("ebay.de"), "EUR");
    }

    #[test]
    fn availability_check_in_eight_countries() {
        let adapter = EbayAdapter::new("US", SearchConfig::default());
        for country in ["US", "GB", "CA", "AU", "DE", "FR", "IT", "ES"] {
            assert!(adapter.is_available_for_country(country), "{country}");
        }
        // eBay does not serve Japan or India, unlike Amazon.
        assert!(!adapter.is_available_for_country("JP"));
        assert!(!adapter.is_available_for_country("IN"));
    }

    #[test]
    fn search_url_encodes_query_and_sort() {
        let adapter = EbayAdapter::new("GB", SearchConfig::default());
        let url = adapter.search_url("mechanical keyboard").expect("url");
        assert_eq!(url.host_str(), Some("www.ebay.co.uk"));
        assert_eq!(url.path(), "/sch/i.html");
        let query = url.query().expect("query");
        assert!(query.contains("_nkw=mechanical+keyboard"));
        assert!(query.contains("_sop=15"));
    }

    #[test]
    fn adapter_reports_store() {
        let adapter = EbayAdapter::new("FR", SearchConfig::default());
        assert_eq!(adapter.store(), Store::Ebay);
        assert_eq!(adapter.store_identifier(), "ebay");
    }

    #[tokio::test]
    #[ignore] // Live test — run with `cargo test -- --ignored`
    async fn live_ebay_search() {
        let adapter = EbayAdapter::new("US", SearchConfig::default());
        let listings = adapter.scrape("usb c cable").await.expect("live scrape");
        for l in &listings {
            assert!(!l.name.is_empty());
            assert!(l.url.starts_with("https://"));
            assert!(l.price > 0.0);
        }
    }
}
