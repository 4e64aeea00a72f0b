//! HTTP capability consumed by strategies.
//!
//! Strategies never touch `reqwest` directly; they build an [`HttpRequest`]
//! and hand it to whatever [`HttpClient`] the caller injected. This keeps
//! every strategy testable against canned responses.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::FetchResult;

/// HTTP method subset used upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several headers.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Look up a header value (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response with its body already read as text.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }

    /// First of the given phrases found in the body.
    pub fn contains_any<'a, S: AsRef<str>>(&self, phrases: &'a [S]) -> Option<&'a str> {
        phrases
            .iter()
            .map(|p| p.as_ref())
            .find(|p| !p.is_empty() && self.body.contains(*p))
    }
}

/// HTTP client capability.
///
/// Implementations:
/// - `ReqwestClient` - production client over `reqwest`
/// - `RateLimitedClient` - paces any inner client
/// - `MockHttpClient` - canned responses for tests
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request and read the full body.
    ///
    /// Non-success statuses are returned as responses, not errors; callers
    /// decide what a status means.
    async fn send(&self, request: HttpRequest) -> FetchResult<HttpResponse>;

    /// Get the client name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://www.instagram.com/p/X/")
            .header("User-Agent", "test")
            .headers([("Accept", "*/*")]);

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.header_value("user-agent"), Some("test"));
        assert_eq!(request.header_value("ACCEPT"), Some("*/*"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(200, "https://x.test", r#"{"a":1}"#);
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["a"], 1);

        let blocked = HttpResponse::new(200, "https://x.test", "Please wait a few minutes");
        assert_eq!(blocked.contains_any(&["Please wait"]), Some("Please wait"));
        assert!(blocked.contains_any(&["nothing"]).is_none());
        assert!(blocked.contains_any(&[""]).is_none());
    }
}
