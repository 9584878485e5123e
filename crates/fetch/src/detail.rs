//! Product detail pages.
//!
//! Each product page embeds one `<script type="application/ld+json">` object
//! describing the book. We read `isbn`, `image`, `description` and
//! `productionDate` from it.

use std::sync::LazyLock;

use harvest_core::{BookDetail, BookRecord};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::HttpClient;
use crate::config::{DetailConfig, DetailMode};
use crate::error::{Error, Result};
use crate::pacing::Pacing;

#[expect(clippy::expect_used)]
static LD_JSON_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("hardcoded selector is valid")
});

/// Read the structured-data block of a product page.
///
/// A top-level array or an `@graph` wrapper is searched for the first object
/// carrying an `isbn`, falling back to the first object.
///
/// # Errors
///
/// [`Error::MissingStructuredData`] when the page has no non-empty tag,
/// [`Error::MalformedStructuredData`] when its content is not a JSON object.
pub fn parse_structured_data(html: &str, url: &str) -> Result<BookDetail> {
    let raw = {
        let document = Html::parse_document(html);
        document
            .select(&LD_JSON_SELECTOR)
            .map(|script| script.text().collect::<String>())
            .find(|text| !text.trim().is_empty())
    };
    let raw = raw.ok_or_else(|| Error::missing_structured_data(url))?;

    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| Error::malformed_structured_data(url, e.to_string()))?;
    let object = product_object(&value)
        .ok_or_else(|| Error::malformed_structured_data(url, "no JSON object in structured data"))?;

    Ok(BookDetail {
        isbn: text_field(object.get("isbn")),
        image: image_field(object.get("image")),
        description: text_field(object.get("description")),
        production_date: text_field(object.get("productionDate")),
    })
}

fn product_object(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    let candidates: Vec<&serde_json::Map<String, Value>> = match value {
        Value::Object(map) => match map.get("@graph") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => return Some(map),
        },
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => return None,
    };

    candidates
        .iter()
        .find(|obj| obj.contains_key("isbn"))
        .or_else(|| candidates.first())
        .copied()
}

fn text_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn image_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.iter().find_map(|item| image_field(Some(item))),
        Value::Object(map) => text_field(map.get("url").or_else(|| map.get("contentUrl"))),
        other => text_field(Some(other)),
    }
}

/// Fetches detail pages under the shared retry policy.
#[derive(Debug, Clone)]
pub struct DetailFetcher {
    client: HttpClient,
    mode: DetailMode,
    sentinel: String,
    pacing: Pacing,
}

impl DetailFetcher {
    pub fn new(client: HttpClient, config: &DetailConfig) -> Self {
        Self {
            client,
            mode: config.mode,
            sentinel: config.sentinel.clone(),
            pacing: config.request_delay,
        }
    }

    /// One attempt: GET the page and read its structured data.
    async fn attempt(&self, url: &Url) -> Result<BookDetail> {
        let html = self.client.get_text(url).await?;
        match (parse_structured_data(&html, url.as_str()), self.mode) {
            (Ok(detail), DetailMode::RequireComplete) if !detail.is_complete() => {
                Err(Error::incomplete_detail(url.as_str(), detail.missing_required()))
            }
            (Ok(detail), _) => Ok(detail),
            (Err(e), DetailMode::RequireComplete) => Err(e),
            (Err(e), DetailMode::BestEffort) if e.is_incomplete_payload() => {
                warn!(url = %url, error = %e, "Structured data unavailable, using sentinel");
                Ok(BookDetail::default())
            }
            (Err(e), DetailMode::BestEffort) => Err(e),
        }
    }

    /// Fetch the detail block for `book` and return the book with it attached.
    ///
    /// In best-effort mode blank fields are filled with the sentinel.
    ///
    /// # Errors
    ///
    /// Returns the page's error once the retry policy gives up on it.
    pub async fn fetch(&self, book: BookRecord) -> Result<BookRecord> {
        let url = Url::parse(&book.url)?;
        self.pacing.wait().await;

        let outcome = self
            .client
            .retry_policy()
            .run(url.as_str(), |_| self.attempt(&url))
            .await?;
        debug!(url = %url, attempts = outcome.attempts, "Detail fetched");

        let detail = match self.mode {
            DetailMode::BestEffort => outcome.value.with_sentinel(&self.sentinel),
            DetailMode::RequireComplete => outcome.value,
        };
        Ok(book.with_detail(detail))
    }
}
