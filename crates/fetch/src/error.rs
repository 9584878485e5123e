//! Error types for catalog acquisition.

use thiserror::Error;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching listing pages, detail pages, or the API.
#[derive(Error, Debug)]
pub enum Error {
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Product page carried no structured-data script tag.
    #[error("no structured data on {url}")]
    MissingStructuredData { url: String },

    /// Structured-data script tag did not parse.
    #[error("malformed structured data on {url}: {reason}")]
    MalformedStructuredData { url: String, reason: String },

    /// Structured data lacked required fields.
    #[error("incomplete detail for {url}: missing {}", missing.join(", "))]
    IncompleteDetail {
        url: String,
        missing: Vec<&'static str>,
    },

    /// Catalog API payload had no recognizable item list.
    #[error("unexpected API payload: {reason}")]
    UnexpectedPayload { reason: String },

    /// Retry policy gave up.
    #[error("gave up on {target} after {attempts} attempts: {last}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        last: Box<Error>,
    },

    /// A detail task ended without producing a result.
    #[error("detail task for {url} did not complete: {reason}")]
    TaskAborted { url: String, reason: String },

    /// CSS selector failed to parse.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Create a missing structured data error.
    pub fn missing_structured_data(url: impl Into<String>) -> Self {
        Self::MissingStructuredData { url: url.into() }
    }

    /// Create a malformed structured data error.
    pub fn malformed_structured_data(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedStructuredData {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an incomplete detail error.
    pub fn incomplete_detail(url: impl Into<String>, missing: Vec<&'static str>) -> Self {
        Self::IncompleteDetail {
            url: url.into(),
            missing,
        }
    }

    /// Create an unexpected payload error.
    pub fn unexpected_payload(reason: impl Into<String>) -> Self {
        Self::UnexpectedPayload {
            reason: reason.into(),
        }
    }

    /// Create a task aborted error.
    pub fn task_aborted(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskAborted {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::RetriesExhausted { last, .. } => last.status_code(),
            _ => None,
        }
    }

    /// True when the server refused us for request volume (403 or 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.status_code(), Some(403 | 429))
    }

    /// True for network-level failures: connect, timeout, or a broken body.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request() || e.is_body(),
            _ => false,
        }
    }

    /// True when the page arrived but its payload was absent, broken, or partial.
    pub const fn is_incomplete_payload(&self) -> bool {
        matches!(
            self,
            Self::MissingStructuredData { .. }
                | Self::MalformedStructuredData { .. }
                | Self::IncompleteDetail { .. }
        )
    }
}
