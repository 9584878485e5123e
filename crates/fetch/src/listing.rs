//! Paginated HTML listing.
//!
//! Pages are requested as `page=1, 2, ...` until one parses to zero title
//! anchors. The storefront is trusted never to serve a spurious empty page
//! mid-sequence; there is no resume and no cross-page deduplication.

use harvest_core::BookRecord;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::client::HttpClient;
use crate::config::ListingConfig;
use crate::error::{Error, Result};
use crate::pacing::Pacing;
use crate::rules::{CatalogRules, collapse_whitespace};

/// Query parameters owned by the listing; any others on the base URL are kept.
const MANAGED_PARAMS: [&str; 5] = ["order", "np", "min_price", "max_price", "page"];

/// Base URL plus the listing's query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub base: Url,
    pub order: String,
    pub np: u32,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
}

impl ListingQuery {
    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UrlParse`] if the base URL is invalid.
    pub fn from_config(config: &ListingConfig) -> Result<Self> {
        Ok(Self {
            base: Url::parse(&config.base_url)?,
            order: config.order.clone(),
            np: config.np,
            price_min: config.price_min,
            price_max: config.price_max,
        })
    }

    /// URL of listing page `page` (1-based).
    pub fn page_url(&self, page: u32) -> Url {
        let kept: Vec<(String, String)> = self
            .base
            .query_pairs()
            .filter(|(k, _)| {
                let key: &str = k;
                !MANAGED_PARAMS.contains(&key)
            })
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(kept);
            pairs.append_pair("order", &self.order);
            pairs.append_pair("np", &self.np.to_string());
            if let Some(min) = self.price_min {
                pairs.append_pair("min_price", &min.to_string());
            }
            if let Some(max) = self.price_max {
                pairs.append_pair("max_price", &max.to_string());
            }
            pairs.append_pair("page", &page.to_string());
        }
        url
    }
}

/// Parse a CSS selector, reporting failures as [`Error::InvalidSelector`].
///
/// # Errors
///
/// Returns an error if `selector` is not valid CSS.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::invalid_selector(selector, e.to_string()))
}

/// What one listing page yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Anchors matched by the selector, usable or not.
    pub matched: usize,
    pub books: Vec<BookRecord>,
}

impl ListingPage {
    /// Whether this page ends pagination.
    pub const fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Extract title/URL pairs from a listing page.
///
/// Relative hrefs are resolved against `page_url`. Anchors with no href or a
/// blank title are skipped and logged.
pub fn parse_listing(html: &str, page_url: &Url, selector: &Selector) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    for anchor in document.select(selector) {
        page.matched = page.matched.saturating_add(1);

        let title = collapse_whitespace(&anchor.text().collect::<String>());
        let Some(href) = anchor.value().attr("href") else {
            warn!(page = %page_url, title = %title, "Listing entry has no href");
            continue;
        };
        if title.is_empty() {
            warn!(page = %page_url, href, "Listing entry has no title");
            continue;
        }

        match page_url.join(href) {
            Ok(url) => page.books.push(BookRecord::new(title, url.as_str())),
            Err(e) => warn!(page = %page_url, href, error = %e, "Unresolvable listing href"),
        }
    }

    page
}

/// Walks the listing until the first empty page.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    client: HttpClient,
    query: ListingQuery,
    selector: Selector,
    rules: CatalogRules,
    pacing: Pacing,
    max_pages: Option<u32>,
}

impl ListingFetcher {
    /// # Errors
    ///
    /// Returns an error for an invalid base URL or selector.
    pub fn new(client: HttpClient, config: &ListingConfig, rules: CatalogRules) -> Result<Self> {
        Ok(Self {
            client,
            query: ListingQuery::from_config(config)?,
            selector: parse_selector(&config.selector)?,
            rules,
            pacing: config.page_delay,
            max_pages: config.max_pages,
        })
    }

    /// Fetch and parse one page under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the page's fetch error once the retry policy gives up.
    pub async fn fetch_page(&self, page: u32) -> Result<ListingPage> {
        let url = self.query.page_url(page);
        let html = self.client.fetch_text(&url).await?;
        Ok(parse_listing(&html, &url, &self.selector))
    }

    /// Every non-excluded book on pages 1..N, in page order.
    ///
    /// # Errors
    ///
    /// Any page failure aborts the walk; there is no partial result.
    pub async fn fetch_all(&self) -> Result<Vec<BookRecord>> {
        let mut books = Vec::new();
        let mut page: u32 = 1;

        loop {
            if self.max_pages.is_some_and(|max| page > max) {
                info!(max_pages = ?self.max_pages, "Page limit reached");
                break;
            }

            let listing = self.fetch_page(page).await?;
            if listing.is_empty() {
                info!(page, "Empty listing page, pagination complete");
                break;
            }

            let found = listing.books.len();
            let kept: Vec<BookRecord> = listing
                .books
                .into_iter()
                .filter(|b| {
                    let excluded = self.rules.is_excluded(&b.title);
                    if excluded {
                        debug!(title = %b.title, "Excluded by title prefix");
                    }
                    !excluded
                })
                .collect();
            info!(page, found, kept = kept.len(), "Listing page scraped");
            books.extend(kept);

            page = page.saturating_add(1);
            self.pacing.wait().await;
        }

        info!(total = books.len(), "Listing complete");
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use crate::config::DEFAULT_LISTING_SELECTOR;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn listing_html(entries: &[(&str, Option<&str>)]) -> String {
        let items: String = entries
            .iter()
            .map(|(title, href)| {
                let href = href.map(|h| format!(r#" href="{h}""#)).unwrap_or_default();
                format!(r#"<li><div class="o-tile-book-info"><h2><a{href}>{title}</a></h2></div></li>"#)
            })
            .collect();
        format!(
            r#"<html><body><div class="all-wrap"><div class="wrap clearfix"><div class="main-area"><div><div class="book-list-area book-result-area book-result-area-1"><ul>{items}</ul></div></div></div></div></div></body></html>"#
        )
    }

    #[test]
    fn test_page_url_sets_parameters() -> TestResult {
        let query = ListingQuery {
            base: Url::parse("https://bookwalker.in.th/categories/3/?page=9&lang=th")?,
            order: "rank".into(),
            np: 1,
            price_min: Some(0),
            price_max: Some(300),
        };

        let url = query.page_url(2);

        assert_eq!(
            url.as_str(),
            "https://bookwalker.in.th/categories/3/?lang=th&order=rank&np=1&min_price=0&max_price=300&page=2"
        );
        Ok(())
    }

    #[test]
    fn test_parse_listing_with_default_selector() -> TestResult {
        let selector = parse_selector(DEFAULT_LISTING_SELECTOR)?;
        let page_url = Url::parse("https://bookwalker.in.th/categories/3/?page=1")?;
        let html = listing_html(&[
            ("  Titan   เล่ม 1 ", Some("/de/111/")),
            ("Slime", Some("https://bookwalker.in.th/de/222/")),
        ]);

        let page = parse_listing(&html, &page_url, &selector);

        assert_eq!(page.matched, 2);
        assert_eq!(page.books[0].title, "Titan เล่ม 1");
        assert_eq!(page.books[0].url, "https://bookwalker.in.th/de/111/");
        assert_eq!(page.books[1].url, "https://bookwalker.in.th/de/222/");
        Ok(())
    }

    #[test]
    fn test_unusable_anchors_count_as_matched() -> TestResult {
        let selector = parse_selector(DEFAULT_LISTING_SELECTOR)?;
        let page_url = Url::parse("https://bookwalker.in.th/categories/3/")?;
        let html = listing_html(&[("No link", None), ("   ", Some("/de/1/"))]);

        let page = parse_listing(&html, &page_url, &selector);

        assert_eq!(page.matched, 2);
        assert!(page.books.is_empty());
        assert!(!page.is_empty());
        Ok(())
    }

    #[test]
    fn test_page_without_list_is_empty() -> TestResult {
        let selector = parse_selector(DEFAULT_LISTING_SELECTOR)?;
        let page_url = Url::parse("https://bookwalker.in.th/categories/3/")?;

        let page = parse_listing("<html><body><p>No results</p></body></html>", &page_url, &selector);

        assert!(page.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        assert!(matches!(
            parse_selector("div >"),
            Err(Error::InvalidSelector { .. })
        ));
    }
}
