//! Configuration for the harvester.
//!
//! Every section has defaults matching the storefront as it is harvested
//! today. A TOML or JSON file may override any subset; a handful of
//! `HARVEST_*` environment variables override the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pacing::Pacing;
use crate::retry::RetryPolicy;
use crate::rules::CatalogRules;

/// A desktop browser user agent; the storefront blocks obvious bots sooner.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// CSS path to the title anchors of the category listing.
pub const DEFAULT_LISTING_SELECTOR: &str = "body > div.all-wrap > div.wrap.clearfix > div.main-area > div > div.book-list-area.book-result-area.book-result-area-1 > ul > li > div.o-tile-book-info > h2 > a";

/// Top-level harvester configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    pub listing: ListingConfig,
    pub detail: DetailConfig,
    pub api: ApiConfig,
    pub rules: CatalogRules,
}

/// Settings shared by every HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Per-request timeout.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Paginated HTML listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub base_url: String,
    pub order: String,
    pub np: u32,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub selector: String,
    /// Pause between consecutive listing pages.
    pub page_delay: Pacing,
    /// Stop after this many pages even if they keep coming.
    pub max_pages: Option<u32>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bookwalker.in.th/categories/3/".to_string(),
            order: "rank".to_string(),
            np: 1,
            price_min: None,
            price_max: None,
            selector: DEFAULT_LISTING_SELECTOR.to_string(),
            page_delay: Pacing::Random {
                min: Duration::from_millis(500),
                max: Duration::from_millis(1_500),
            },
            max_pages: None,
        }
    }
}

/// How strictly a detail page must be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailMode {
    /// Keep whatever is present and write the sentinel into the gaps.
    BestEffort,
    /// Treat a missing isbn, image, or description as a retryable failure.
    #[default]
    RequireComplete,
}

impl std::fmt::Display for DetailMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => write!(f, "best-effort"),
            Self::RequireComplete => write!(f, "require-complete"),
        }
    }
}

/// Detail-page fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Concurrent detail fetches.
    pub workers: usize,
    pub mode: DetailMode,
    /// Placeholder for fields the page did not supply (best-effort mode).
    pub sentinel: String,
    /// Pause before each detail request, per worker.
    pub request_delay: Pacing,
    /// Emit abandoned books without a detail block instead of dropping them.
    pub keep_failed: bool,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            mode: DetailMode::default(),
            sentinel: harvest_core::DEFAULT_SENTINEL.to_string(),
            request_delay: Pacing::Fixed {
                delay: Duration::from_millis(500),
            },
            keep_failed: false,
        }
    }
}

/// The JSON catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub page_size: u32,
    pub sort_by: String,
    pub max_pages: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://bookwalker.in.th/api/v1/products".to_string(),
            page_size: 1_000,
            sort_by: "release_date".to_string(),
            max_pages: None,
        }
    }
}

impl HarvestConfig {
    /// Defaults, then `path` if given, then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the result
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; `.json` is read as JSON, anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::config_error(format!("Failed to parse config: {e}")))
        }
    }

    /// Override fields from `HARVEST_*` environment variables.
    ///
    /// Unparseable numeric values are ignored.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(agent) = var("HARVEST_USER_AGENT") {
            self.http.user_agent = agent;
        }
        if let Some(ms) = var("HARVEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.http.timeout = Duration::from_millis(ms);
        }
        if let Some(workers) = var("HARVEST_WORKERS").and_then(|v| v.parse().ok()) {
            self.detail.workers = workers;
        }
        if let Some(attempts) = var("HARVEST_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.retry.max_attempts = attempts;
        }
        if let Some(url) = var("HARVEST_API_URL") {
            self.api.endpoint = url;
        }
        if let Some(url) = var("HARVEST_LISTING_URL") {
            self.listing.base_url = url;
        }
        self
    }

    /// Reject settings that cannot produce a run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::config_error("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(Error::config_error(
                "retry.base_delay must not exceed retry.max_delay",
            ));
        }
        if self.detail.workers == 0 {
            return Err(Error::config_error("detail.workers must be at least 1"));
        }
        if self.api.page_size == 0 {
            return Err(Error::config_error("api.page_size must be at least 1"));
        }
        if let (Some(min), Some(max)) = (self.listing.price_min, self.listing.price_max) {
            if min > max {
                return Err(Error::config_error(format!(
                    "listing.price_min ({min}) exceeds listing.price_max ({max})"
                )));
            }
        }
        self.listing.page_delay.validate()?;
        self.detail.request_delay.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_api_endpoint(mut self, url: impl Into<String>) -> Self {
        self.api.endpoint = url.into();
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.detail.workers = workers;
        self
    }

    /// Remove every pause; used by tests and by `--delay-ms 0`.
    #[must_use]
    pub const fn without_pacing(mut self) -> Self {
        self.listing.page_delay = Pacing::None;
        self.detail.request_delay = Pacing::None;
        self
    }
}

/// Serialization helper for Duration as milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// # Errors
    ///
    /// Propagates the serializer's error.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    /// # Errors
    ///
    /// Fails when the value is not an unsigned integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_default_config() {
        let config = HarvestConfig::default();
        assert_eq!(config.detail.workers, 3);
        assert_eq!(config.detail.mode, DetailMode::RequireComplete);
        assert_eq!(config.api.page_size, 1_000);
        assert_eq!(config.listing.order, "rank");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> TestResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
[detail]
workers = 5
mode = "best-effort"

[retry]
max_attempts = 8
base_delay = 250

[listing.page_delay]
kind = "fixed"
delay = 2000
"#
        )?;

        let config = HarvestConfig::from_file(file.path())?;

        assert_eq!(config.detail.workers, 5);
        assert_eq!(config.detail.mode, DetailMode::BestEffort);
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(60));
        assert_eq!(
            config.listing.page_delay,
            Pacing::Fixed {
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(config.http.user_agent, BROWSER_USER_AGENT);
        Ok(())
    }

    #[test]
    fn test_json_file_is_read_as_json() -> TestResult {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        write!(file, r#"{{"api": {{"page_size": 50, "sort_by": "title"}}}}"#)?;

        let config = HarvestConfig::from_file(file.path())?;

        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.api.sort_by, "title");
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HARVEST_WORKERS", "10"),
            ("HARVEST_TIMEOUT_MS", "2500"),
            ("HARVEST_MAX_ATTEMPTS", "not-a-number"),
            ("HARVEST_API_URL", "http://localhost:9000/api"),
        ]
        .into_iter()
        .collect();

        let config = HarvestConfig::default().apply_vars(|k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.detail.workers, 10);
        assert_eq!(config.http.timeout, Duration::from_millis(2_500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.api.endpoint, "http://localhost:9000/api");
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = HarvestConfig::default().with_workers(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_price_range() {
        let mut config = HarvestConfig::default();
        config.listing.price_min = Some(500);
        config.listing.price_max = Some(100);
        let err = config.validate().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("price_min"));
    }

    #[test]
    fn test_detail_mode_display() {
        assert_eq!(DetailMode::BestEffort.to_string(), "best-effort");
        assert_eq!(DetailMode::RequireComplete.to_string(), "require-complete");
    }
}
