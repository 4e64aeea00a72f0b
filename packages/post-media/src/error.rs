//! Typed errors for the post-media library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the chain can
//! match on the failure kind of every strategy attempt.

use thiserror::Error;

/// Errors surfaced by extraction and by individual strategy attempts.
///
/// Only `InvalidSourceUrl` ever escapes [`crate::Extractor::extract`]. The
/// per-strategy kinds are folded into `StrategyOutcome`s by the chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// Input did not match any recognized post path shape
    #[error("invalid source URL: {url}")]
    InvalidSourceUrl { url: String },

    /// Transport failure, non-success status or per-attempt deadline expiry
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Upstream answered with a known blocking phrase
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Payload arrived but yielded no usable media
    #[error("no parseable content: {0}")]
    NoParseableContent(String),

    /// Chain exhausted without any media
    #[error("no media found: {0}")]
    NoMediaFound(String),

    /// Overall operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Whether the chain may move on to the next strategy after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure(_) | Self::RateLimited(_) | Self::NoParseableContent(_)
        )
    }
}

/// Errors raised by an [`crate::traits::http::HttpClient`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Upstream returned a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request could not be built (bad header, bad URL)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FetchError> for ExtractError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { status: 429, ref url } => {
                ExtractError::RateLimited(format!("HTTP 429 from {}", url))
            }
            other => ExtractError::NetworkFailure(other.to_string()),
        }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Result type alias for HTTP capability operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
