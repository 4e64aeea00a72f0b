//! Production HTTP client over `reqwest`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::http::{HttpClient, HttpRequest, HttpResponse, Method};

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// [`HttpClient`] backed by a shared `reqwest::Client`.
///
/// # Example
///
/// ```rust,ignore
/// use post_media::http::ReqwestClient;
///
/// let client = ReqwestClient::new(Duration::from_secs(15))?;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> FetchResult<reqwest::RequestBuilder> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request.url, e)))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> FetchResult<HttpResponse> {
        let url = request.url.clone();
        debug!(url = %url, method = ?request.method, "HTTP request starting");

        let response = self.build(request)?.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else if e.is_builder() {
                FetchError::InvalidRequest(e.to_string())
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        debug!(url = %final_url, status, bytes = body.len(), "HTTP response read");
        Ok(HttpResponse::new(status, final_url, body))
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let client = ReqwestClient::new(Duration::from_secs(1)).unwrap();
        let err = client
            .send(HttpRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[test]
    fn test_name() {
        let client = ReqwestClient::with_client(reqwest::Client::new());
        assert_eq!(client.name(), "reqwest");
    }
}
