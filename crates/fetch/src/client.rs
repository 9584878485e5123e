//! HTTP client shared by the listing, detail, and API fetchers.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// A reqwest client carrying the browser user agent, the per-request timeout,
/// and the retry policy every caller runs its requests under.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    retry: Arc<RetryPolicy>,
}

impl HttpClient {
    /// Build a client from HTTP settings and a retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the underlying client cannot be built
    /// (for example an invalid user-agent header value).
    pub fn new(config: &HttpConfig, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            retry: Arc::new(retry),
        })
    }

    /// The retry policy requests should run under.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One GET attempt; a non-success status becomes [`Error::Status`].
    ///
    /// # Errors
    ///
    /// Returns a transport error, a status error, or a body decoding error.
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.http.get(url.as_str()).send().await?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "GET");

        if !status.is_success() {
            return Err(Error::status(url.as_str(), status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// One GET attempt decoded as JSON.
    ///
    /// # Errors
    ///
    /// As [`HttpClient::get_text`], plus [`Error::Json`] if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or [`Error::RetriesExhausted`].
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        let outcome = self
            .retry
            .run(url.as_str(), |_| self.get_text(url))
            .await?;
        Ok(outcome.value)
    }
}
