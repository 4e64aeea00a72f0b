//! Extraction results, per-strategy outcomes and the JSON envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::types::media::MediaCandidate;
use crate::types::source::{PostType, SourceUrl};

/// Author used when nothing in the payload names one.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// The outcome of extracting one post.
///
/// `media` is pairwise distinct by URL, videos precede images, and within
/// each kind hd precedes standard (then unknown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: String,

    pub author: String,

    pub description: String,

    pub post_type: PostType,

    pub source_url: String,

    pub media: Vec<MediaCandidate>,

    pub timestamp: DateTime<Utc>,

    /// Name of the strategy that produced this result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Last diagnostic message, set when `media` is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ExtractionResult {
    /// Create a result with default metadata for the given source.
    pub fn new(source: &SourceUrl, timestamp: DateTime<Utc>) -> Self {
        Self {
            title: source.post_type().default_title().to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            description: String::new(),
            post_type: source.post_type(),
            source_url: source.as_str().to_string(),
            media: Vec::new(),
            timestamp,
            strategy: None,
            last_error: None,
        }
    }

    /// Empty-media result carrying the diagnostic for why nothing was found.
    pub fn placeholder(
        source: &SourceUrl,
        timestamp: DateTime<Utc>,
        last_error: Option<&ExtractError>,
    ) -> Self {
        let message = match last_error {
            Some(err) => err.to_string(),
            None => ExtractError::NoMediaFound("no strategy produced media".into()).to_string(),
        };
        Self {
            last_error: Some(message),
            ..Self::new(source, timestamp)
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    /// Whether any entry is an hd-quality video.
    pub fn has_hd_video(&self) -> bool {
        self.media.iter().any(MediaCandidate::is_hd_video)
    }

    pub fn videos(&self) -> impl Iterator<Item = &MediaCandidate> {
        self.media.iter().filter(|m| m.is_video())
    }

    pub fn images(&self) -> impl Iterator<Item = &MediaCandidate> {
        self.media.iter().filter(|m| !m.is_video())
    }
}

/// Record of one strategy invocation. Never persisted.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub strategy_name: String,
    pub success: bool,
    pub result: Option<ExtractionResult>,
    pub error: Option<ExtractError>,
}

impl StrategyOutcome {
    pub fn succeeded(strategy_name: impl Into<String>, result: ExtractionResult) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(strategy_name: impl Into<String>, error: ExtractError) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON envelope used by HTTP- and CLI-facing wrappers:
/// `{success, data | error, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp,
        }
    }

    pub fn err(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::types::media::{MediaKind, Quality};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_placeholder_carries_last_error() {
        let source = normalize("https://www.instagram.com/p/ABC123/").unwrap();
        let err = ExtractError::NetworkFailure("connection reset".into());
        let result = ExtractionResult::placeholder(&source, fixed_time(), Some(&err));

        assert!(!result.has_media());
        assert_eq!(
            result.last_error.as_deref(),
            Some("network failure: connection reset")
        );
        assert_eq!(result.author, UNKNOWN_AUTHOR);
        assert_eq!(result.title, "Instagram Post");
    }

    #[test]
    fn test_placeholder_without_error_reports_no_media() {
        let source = normalize("https://www.instagram.com/reel/ABC123/").unwrap();
        let result = ExtractionResult::placeholder(&source, fixed_time(), None);
        assert!(result
            .last_error
            .as_deref()
            .unwrap()
            .starts_with("no media found"));
    }

    #[test]
    fn test_wire_shape() {
        let source = normalize("https://www.instagram.com/reel/ABC123/").unwrap();
        let mut result = ExtractionResult::new(&source, fixed_time());
        result.media.push(MediaCandidate {
            kind: MediaKind::Video,
            url: "https://cdn.example/v_hd.mp4".into(),
            quality: Quality::Hd,
            width: Some(1080),
            height: None,
            duration: None,
            thumbnail: None,
        });

        let envelope = Envelope::ok(result, fixed_time());
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["postType"], "reel");
        assert_eq!(json["data"]["sourceUrl"], "https://www.instagram.com/reel/ABC123/");
        assert_eq!(json["data"]["media"][0]["type"], "video");
        assert_eq!(json["data"]["media"][0]["quality"], "hd");
        assert_eq!(json["data"]["media"][0]["width"], 1080);
        assert!(json["data"]["media"][0].get("height").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let envelope: Envelope<ExtractionResult> =
            Envelope::err("invalid source URL: x", fixed_time());
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "invalid source URL: x");
        assert!(json.get("data").is_none());
    }
}
