//! Catalog API paging and series grouping against a mock endpoint.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::time::Duration;

use harvest_fetch::{ApiFetcher, HarvestConfig, HttpClient, RetryPolicy, group_series};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn config(server: &MockServer, page_size: u32) -> HarvestConfig {
    let mut config = HarvestConfig::default()
        .without_pacing()
        .with_retry(
            RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20))
                .without_jitter(),
        )
        .with_api_endpoint(format!("{}/api/v1/products", server.uri()));
    config.api.page_size = page_size;
    config
}

#[tokio::test]
async fn test_pages_until_short_page_then_groups() -> TestResult {
    // GIVEN: a full first page (after one 503) and a short second page
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .and(query_param("p", "1"))
        .and(query_param("p_size", "2"))
        .and(query_param("sort_by", "release_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"productName": "[Short Story Set] Foo", "seriesId": 1},
                {"productName": "Bar เล่ม 2", "seriesId": 1, "seriesName": "Bar", "productId": 102}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"productName": "Solo", "productId": "900", "isbn": "9786160000900"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, 2);
    let client = HttpClient::new(&config.http, config.retry.clone())?;
    let fetcher = ApiFetcher::new(client, &config.api)?;

    // WHEN: reading the catalog and grouping it
    let items = fetcher.fetch_all().await?;
    let groups = group_series(&items, &config.rules);

    // THEN: three items read, the short-story set excluded, singles kept apart
    assert_eq!(items.len(), 3);
    assert_eq!(groups.len(), 2);

    let bar = groups.first().ok_or("missing series group")?;
    assert_eq!(bar.series_id, "1");
    assert_eq!(bar.series_name, "Bar");
    let book = bar.books.first().ok_or("missing book")?;
    assert_eq!(book.sortable_title.as_deref(), Some("Bar 2"));
    assert_eq!(book.product_id.as_deref(), Some("102"));

    let solo = groups.get(1).ok_or("missing singleton group")?;
    assert_eq!(solo.series_id, "900");
    assert_eq!(solo.series_name, "Solo");
    Ok(())
}

#[tokio::test]
async fn test_empty_first_page_is_empty_catalog() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, 1000);
    let client = HttpClient::new(&config.http, config.retry.clone())?;

    let items = ApiFetcher::new(client, &config.api)?.fetch_all().await?;

    assert!(items.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_payload_is_not_retried() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "maintenance"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, 1000);
    let client = HttpClient::new(&config.http, config.retry.clone())?;

    let result = ApiFetcher::new(client, &config.api)?.fetch_all().await;

    assert!(matches!(result, Err(harvest_fetch::Error::UnexpectedPayload { .. })));
    Ok(())
}
