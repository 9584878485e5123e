//! The storefront's JSON catalog API.
//!
//! The endpoint is undocumented. It pages with `p` (1-based), `p_size` and
//! `sort_by`; the item list has been seen both bare and wrapped in an envelope,
//! so [`parse_api_page`] accepts either.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::client::HttpClient;
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Envelope keys the item list may live under.
const LIST_KEYS: [&str; 4] = ["data", "items", "products", "results"];

/// One catalog item as the API returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub product_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub series_id: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub product_id: Option<String>,
    #[serde(default, alias = "url")]
    pub product_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub isbn: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "productionDate")]
    pub publish_date: Option<String>,
}

impl ApiItem {
    /// Item with just a name and optional series fields.
    pub fn named(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_series(mut self, series_id: impl Into<String>, series_name: Option<&str>) -> Self {
        self.series_id = Some(series_id.into());
        self.series_name = series_name.map(ToString::to_string);
        self
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode one page of the catalog API.
///
/// # Errors
///
/// [`Error::UnexpectedPayload`] when no item list can be found, or
/// [`Error::Json`] when an item does not decode.
pub fn parse_api_page(payload: Value) -> Result<Vec<ApiItem>> {
    let list = find_item_list(payload).ok_or_else(|| {
        Error::unexpected_payload(format!("no item list under any of {LIST_KEYS:?}"))
    })?;
    list.into_iter()
        .map(|item| serde_json::from_value(item).map_err(Error::from))
        .collect()
}

fn find_item_list(payload: Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| map.remove(*key))
            .and_then(|inner| match inner {
                Value::Array(items) => Some(items),
                nested @ Value::Object(_) => find_item_list(nested),
                _ => None,
            }),
        _ => None,
    }
}

/// Endpoint plus paging parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub endpoint: Url,
    pub page_size: u32,
    pub sort_by: String,
}

impl ApiQuery {
    /// # Errors
    ///
    /// Returns [`Error::UrlParse`] if the endpoint is invalid.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Url::parse(&config.endpoint)?,
            page_size: config.page_size,
            sort_by: config.sort_by.clone(),
        })
    }

    /// URL of API page `page` (1-based).
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("p", &page.to_string())
            .append_pair("p_size", &self.page_size.to_string())
            .append_pair("sort_by", &self.sort_by);
        url
    }
}

/// Reads the whole catalog from the API.
#[derive(Debug, Clone)]
pub struct ApiFetcher {
    client: HttpClient,
    query: ApiQuery,
    max_pages: Option<u32>,
}

impl ApiFetcher {
    /// # Errors
    ///
    /// Returns an error for an invalid endpoint.
    pub fn new(client: HttpClient, config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client,
            query: ApiQuery::from_config(config)?,
            max_pages: config.max_pages,
        })
    }

    /// Fetch one page under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decode error.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<ApiItem>> {
        let url = self.query.page_url(page);
        let outcome = self
            .client
            .retry_policy()
            .run(url.as_str(), |_| self.client.get_json::<Value>(&url))
            .await?;
        parse_api_page(outcome.value)
    }

    /// Every item, page after page, until an empty or short page.
    ///
    /// # Errors
    ///
    /// Any page failure aborts the fetch.
    pub async fn fetch_all(&self) -> Result<Vec<ApiItem>> {
        let page_size = usize::try_from(self.query.page_size).unwrap_or(usize::MAX);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            if self.max_pages.is_some_and(|max| page > max) {
                info!(max_pages = ?self.max_pages, "Page limit reached");
                break;
            }

            let batch = self.fetch_page(page).await?;
            let count = batch.len();
            info!(page, count, "Catalog API page fetched");
            items.extend(batch);

            if count < page_size {
                break;
            }
            page = page.saturating_add(1);
        }

        info!(total = items.len(), "Catalog API complete");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use serde_json::json;

    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_bare_array() -> TestResult {
        let items = parse_api_page(json!([{"productName": "Foo", "seriesId": 12}]))?;
        assert_eq!(items[0].product_name, "Foo");
        assert_eq!(items[0].series_id.as_deref(), Some("12"));
        Ok(())
    }

    #[test]
    fn test_nested_envelope() -> TestResult {
        let payload = json!({
            "status": "ok",
            "data": {"items": [
                {"productName": "Bar เล่ม 2", "seriesId": "1", "seriesName": "Bar",
                 "url": "https://bookwalker.in.th/de/2/", "imageUrl": "c.jpg", "productionDate": "2024-02-01"}
            ]}
        });

        let items = parse_api_page(payload)?;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_url.as_deref(), Some("https://bookwalker.in.th/de/2/"));
        assert_eq!(items[0].image.as_deref(), Some("c.jpg"));
        assert_eq!(items[0].publish_date.as_deref(), Some("2024-02-01"));
        Ok(())
    }

    #[test]
    fn test_blank_series_id_is_none() -> TestResult {
        let items = parse_api_page(json!({"products": [{"productName": "Solo", "seriesId": ""}]}))?;
        assert_eq!(items[0].series_id, None);
        Ok(())
    }

    #[test]
    fn test_unknown_envelope_is_rejected() {
        let result = parse_api_page(json!({"rows": []}));
        assert!(matches!(result, Err(Error::UnexpectedPayload { .. })));
    }

    #[test]
    fn test_item_without_name_is_rejected() {
        let result = parse_api_page(json!([{"seriesId": "1"}]));
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_page_url() -> TestResult {
        let query = ApiQuery {
            endpoint: Url::parse("https://bookwalker.in.th/api/v1/products")?,
            page_size: 1000,
            sort_by: "release_date".into(),
        };
        assert_eq!(
            query.page_url(3).as_str(),
            "https://bookwalker.in.th/api/v1/products?p=3&p_size=1000&sort_by=release_date"
        );
        Ok(())
    }
}
