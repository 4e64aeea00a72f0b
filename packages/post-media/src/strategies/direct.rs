//! Direct page fetch with a mobile browser header set.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::pipeline::MediaPipeline;
use crate::strategies::{browser_headers, check_response};
use crate::traits::http::{HttpClient, HttpRequest};
use crate::traits::strategy::Strategy;
use crate::types::config::ExtractorConfig;
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

/// Path the upstream redirects anonymous clients to when it refuses a page.
const LOGIN_PATH: &str = "/accounts/login";

/// Fetches the post page itself. Highest yield when not blocked.
pub struct DirectPageStrategy {
    http: Arc<dyn HttpClient>,
    config: Arc<ExtractorConfig>,
}

impl DirectPageStrategy {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<ExtractorConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl Strategy for DirectPageStrategy {
    fn name(&self) -> &str {
        "direct"
    }

    async fn attempt(
        &self,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult> {
        let request = HttpRequest::get(source.as_str())
            .headers(browser_headers(&self.config.mobile_user_agent))
            .header("Referer", "https://www.instagram.com/");

        let response = self.http.send(request).await?;
        debug!(status = response.status, bytes = response.body.len(), "Page fetched");

        if response.url.contains(LOGIN_PATH) {
            return Err(ExtractError::RateLimited(format!(
                "redirected to login: {}",
                response.url
            )));
        }
        check_response(&response, &self.config)?;

        pipeline.process(&response.body, source, self.name())
    }
}
