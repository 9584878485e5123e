#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # harvest-fetch
//!
//! Catalog acquisition for the bookwalker.in.th storefront.
//!
//! Two paths produce a catalog:
//!
//! - The JSON catalog API, paged and grouped into series ([`ApiFetcher`],
//!   [`group_series`])
//! - The HTML listing walked page by page, then one detail page per book
//!   fetched over a bounded pool ([`ListingFetcher`], [`fetch_details`])
//!
//! Every request runs under a shared [`RetryPolicy`] with capped exponential
//! backoff.
//!
//! ## Example
//!
//! ```ignore
//! use harvest_fetch::{HarvestConfig, HttpClient, ListingFetcher, DetailFetcher, fetch_details};
//!
//! let config = HarvestConfig::load(None)?;
//! let client = HttpClient::new(&config.http, config.retry.clone())?;
//! let listing = ListingFetcher::new(client.clone(), &config.listing, config.rules.clone())?;
//! let books = listing.fetch_all().await?;
//! let detail = DetailFetcher::new(client, &config.detail);
//! let report = fetch_details(&detail, books, config.detail.workers).await;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod detail;
pub mod error;
pub mod listing;
pub mod orchestrator;
pub mod pacing;
pub mod retry;
pub mod rules;
pub mod series;

pub use api::{ApiFetcher, ApiItem, ApiQuery, parse_api_page};
pub use client::HttpClient;
pub use config::{ApiConfig, DetailConfig, DetailMode, HarvestConfig, HttpConfig, ListingConfig};
pub use detail::{DetailFetcher, parse_structured_data};
pub use error::{Error, Result};
pub use listing::{ListingFetcher, ListingPage, ListingQuery, parse_listing, parse_selector};
pub use orchestrator::{DetailFailure, DetailReport, fetch_details};
pub use pacing::Pacing;
pub use retry::{Retried, RetryPolicy};
pub use rules::{CatalogRules, collapse_whitespace};
pub use series::{group_series, to_book};
