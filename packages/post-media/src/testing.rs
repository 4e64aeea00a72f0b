//! Testing utilities including mock implementations.
//!
//! These let applications exercise extraction and the strategy chain
//! without network access or wall-clock time.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ExtractError, FetchError, FetchResult, Result};
use crate::pipeline::MediaPipeline;
use crate::traits::{
    clock::Clock,
    http::{HttpClient, HttpRequest, HttpResponse},
    strategy::Strategy,
};
use crate::types::media::{MediaCandidate, MediaKind, Quality};
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2024-01-01T00:00:00Z
    pub fn epoch() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared invocation counter handed out by mocks.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Canned reply for a URL prefix.
#[derive(Debug, Clone)]
enum MockReply {
    Respond { status: u16, body: String },
    Timeout,
    Refused,
}

/// A mock HTTP client for testing.
///
/// Replies are matched by URL prefix (longest prefix wins). Unmatched URLs
/// get an empty 404.
#[derive(Default, Clone)]
pub struct MockHttpClient {
    /// Replies by URL prefix
    routes: Arc<RwLock<Vec<(String, MockReply)>>>,

    /// Delay before every reply
    delay: Option<Duration>,

    /// Call tracking for assertions
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock client with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply 200 with `body` for URLs starting with `prefix`.
    pub fn with_body(self, prefix: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(prefix, 200, body)
    }

    /// Reply with `status` and `body` for URLs starting with `prefix`.
    pub fn with_response(
        self,
        prefix: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.route(
            prefix,
            MockReply::Respond {
                status,
                body: body.into(),
            },
        )
    }

    /// Fail with a timeout for URLs starting with `prefix`.
    pub fn timeout_prefix(self, prefix: impl Into<String>) -> Self {
        self.route(prefix, MockReply::Timeout)
    }

    /// Fail with a refused connection for URLs starting with `prefix`.
    pub fn fail_prefix(self, prefix: impl Into<String>) -> Self {
        self.route(prefix, MockReply::Refused)
    }

    /// Wait `delay` before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn route(self, prefix: impl Into<String>, reply: MockReply) -> Self {
        self.routes.write().unwrap().push((prefix.into(), reply));
        self
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }

    /// Number of requests sent so far.
    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.requests
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }

    fn reply_for(&self, url: &str) -> Option<MockReply> {
        self.routes
            .read()
            .unwrap()
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> FetchResult<HttpResponse> {
        let url = request.url.clone();
        self.requests.write().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.reply_for(&url) {
            Some(MockReply::Respond { status, body }) => Ok(HttpResponse::new(status, url, body)),
            Some(MockReply::Timeout) => Err(FetchError::Timeout { url }),
            Some(MockReply::Refused) => Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Mock connection refused",
            )))),
            None => Ok(HttpResponse::new(404, url, "")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A strategy with a scripted outcome.
pub struct MockStrategy {
    name: String,
    outcome: Result<ExtractionResult>,
    delay: Option<Duration>,
    calls: CallCounter,
}

impl MockStrategy {
    /// Always succeed with `result` (stamped with this strategy's name).
    pub fn succeeding(name: impl Into<String>, result: ExtractionResult) -> Self {
        let name = name.into();
        Self {
            outcome: Ok(result.with_strategy(name.clone())),
            name,
            delay: None,
            calls: CallCounter::default(),
        }
    }

    /// Always fail with `error`.
    pub fn failing(name: impl Into<String>, error: ExtractError) -> Self {
        Self {
            name: name.into(),
            outcome: Err(error),
            delay: None,
            calls: CallCounter::default(),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to this strategy's invocation count.
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl Strategy for MockStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(
        &self,
        _source: &SourceUrl,
        _pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult> {
        self.calls.increment();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

fn candidate(kind: MediaKind, url: &str, quality: Quality) -> MediaCandidate {
    MediaCandidate {
        kind,
        url: url.to_string(),
        quality,
        width: None,
        height: None,
        duration: None,
        thumbnail: None,
    }
}

/// A result holding a single hd video.
pub fn hd_video_result(source: &SourceUrl, url: &str) -> ExtractionResult {
    let mut result = ExtractionResult::new(source, FixedClock::epoch().now());
    result.media.push(candidate(MediaKind::Video, url, Quality::Hd));
    result
}

/// A result holding a single standard image.
pub fn image_result(source: &SourceUrl, url: &str) -> ExtractionResult {
    let mut result = ExtractionResult::new(source, FixedClock::epoch().now());
    result
        .media
        .push(candidate(MediaKind::Image, url, Quality::Standard));
    result
}
