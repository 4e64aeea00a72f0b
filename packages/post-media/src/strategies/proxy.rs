//! Page fetch routed through third-party relays.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::pipeline::MediaPipeline;
use crate::strategies::{browser_headers, check_response};
use crate::traits::http::{HttpClient, HttpRequest};
use crate::traits::strategy::Strategy;
use crate::types::config::{fill_template, ExtractorConfig};
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

/// Tries each configured relay in order until one returns a payload of at
/// least `min_relay_payload` bytes that yields media.
///
/// Relays egress from different addresses, so a block on one relay does not
/// end the attempt.
pub struct ProxyRelayStrategy {
    http: Arc<dyn HttpClient>,
    config: Arc<ExtractorConfig>,
}

impl ProxyRelayStrategy {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<ExtractorConfig>) -> Self {
        Self { http, config }
    }

    async fn through(
        &self,
        relay_url: String,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult> {
        let request =
            HttpRequest::get(relay_url).headers(browser_headers(&self.config.user_agent));
        let response = self.http.send(request).await?;
        check_response(&response, &self.config)?;

        if response.body.len() < self.config.min_relay_payload {
            return Err(ExtractError::NoParseableContent(format!(
                "relay payload too small ({} bytes)",
                response.body.len()
            )));
        }

        pipeline.process(&response.body, source, self.name())
    }
}

#[async_trait]
impl Strategy for ProxyRelayStrategy {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn attempt(
        &self,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult> {
        let mut last_error = ExtractError::NoParseableContent("no relays configured".into());

        for template in &self.config.relays {
            let relay_url = fill_template(template, source.as_str(), source.shortcode());
            match self.through(relay_url, source, pipeline).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    debug!(relay = %template, error = %err, "Relay failed, trying next");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize;
    use crate::testing::{FixedClock, MockHttpClient};

    fn page() -> String {
        format!(
            r#"<html><head>
            <meta property="og:image" content="https://scontent.cdninstagram.com/v/t51/photo.jpg?_nc_ht=x">
            </head><body>{}</body></html>"#,
            "x".repeat(1200)
        )
    }

    fn setup(client: MockHttpClient) -> (ProxyRelayStrategy, MediaPipeline) {
        let config = Arc::new(
            ExtractorConfig::default()
                .with_relays(["https://relay-a.test/raw?url={url}", "https://relay-b.test/?{url}"]),
        );
        let pipeline = MediaPipeline::new(&config, Arc::new(FixedClock::epoch()));
        (ProxyRelayStrategy::new(Arc::new(client), config), pipeline)
    }

    #[tokio::test]
    async fn test_small_payload_moves_to_next_relay() {
        let client = MockHttpClient::new()
            .with_body("https://relay-a.test/", "<html>tiny</html>")
            .with_body("https://relay-b.test/", page());
        let (strategy, pipeline) = setup(client.clone());
        let source = normalize("https://www.instagram.com/p/ABC123/").unwrap();

        let result = strategy.attempt(&source, &pipeline).await.unwrap();

        assert_eq!(result.media.len(), 1);
        assert_eq!(result.strategy.as_deref(), Some("proxy"));
        assert_eq!(client.call_count(), 2);
        assert_eq!(
            client.requests()[1].url,
            "https://relay-b.test/?https%3A%2F%2Fwww.instagram.com%2Fp%2FABC123%2F"
        );
    }

    #[tokio::test]
    async fn test_first_good_relay_wins() {
        let client = MockHttpClient::new().with_body("https://relay-a.test/", page());
        let (strategy, pipeline) = setup(client.clone());
        let source = normalize("https://www.instagram.com/p/ABC123/").unwrap();

        strategy.attempt(&source, &pipeline).await.unwrap();
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_relays_fail() {
        let client = MockHttpClient::new()
            .fail_prefix("https://relay-a.test/")
            .with_body("https://relay-b.test/", "too small");
        let (strategy, pipeline) = setup(client);
        let source = normalize("https://www.instagram.com/p/ABC123/").unwrap();

        let err = strategy.attempt(&source, &pipeline).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoParseableContent(_)));
    }
}
