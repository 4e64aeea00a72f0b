//! oEmbed lookup.
//!
//! The oEmbed document names the author, a title and a thumbnail, but never
//! the video itself. For reels and IGTV a video URL is guessed from the
//! thumbnail path and flagged with quality `unknown`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::{ExtractError, Result};
use crate::pipeline::clean::{path_extension, unescape};
use crate::pipeline::MediaPipeline;
use crate::strategies::check_response;
use crate::traits::http::{HttpClient, HttpRequest};
use crate::traits::strategy::Strategy;
use crate::types::config::{fill_template, ExtractorConfig};
use crate::types::media::{MediaKind, RawCandidate};
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

const DERIVABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic"];

/// Guess a video URL from a thumbnail URL by swapping its image extension
/// for `.mp4`. Query and host are kept.
pub fn derive_video_url(thumbnail: &str) -> Option<String> {
    let mut url = Url::parse(unescape(thumbnail).trim()).ok()?;
    let ext = path_extension(&url)?;
    if !DERIVABLE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    let path = url.path();
    let stem = &path[..path.len() - ext.len() - 1];
    let derived_path = format!("{}.mp4", stem);
    url.set_path(&derived_path);
    Some(url.to_string())
}

/// Strategy backed by the official oEmbed endpoint.
pub struct EmbedStrategy {
    http: Arc<dyn HttpClient>,
    config: Arc<ExtractorConfig>,
}

impl EmbedStrategy {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<ExtractorConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl Strategy for EmbedStrategy {
    fn name(&self) -> &str {
        "embed"
    }

    async fn attempt(
        &self,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult> {
        let endpoint = fill_template(
            &self.config.oembed_endpoint,
            source.as_str(),
            source.shortcode(),
        );
        let request = HttpRequest::get(endpoint)
            .header("User-Agent", self.config.user_agent.as_str())
            .header("Accept", "application/json");

        let response = self.http.send(request).await?;
        check_response(&response, &self.config)?;

        if response.json::<serde_json::Value>().is_err() {
            return Err(ExtractError::NoParseableContent(
                "oEmbed response is not JSON".into(),
            ));
        }

        let mut extracted = pipeline.extract(&response.body, source);

        if source.post_type().is_video_type() {
            let derived: Vec<RawCandidate> = extracted
                .media
                .iter()
                .filter(|m| m.kind == MediaKind::Image)
                .filter_map(|m| {
                    derive_video_url(&m.url).map(|url| {
                        RawCandidate::video(url)
                            .derived()
                            .with_thumbnail(Some(m.url.clone()))
                    })
                })
                .collect();

            debug!(count = derived.len(), "Derived video candidates from thumbnail");
            extracted.media.extend(derived);
        }

        pipeline.finish(source, extracted, self.name())
    }
}
