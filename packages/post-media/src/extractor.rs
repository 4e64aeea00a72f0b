//! The public entry point: normalize, run the chain, select a result.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::pipeline::{normalize, ChainReport, MediaPipeline, StrategyChain};
use crate::strategies::{build_strategies, StrategyKind};
use crate::traits::clock::{Clock, SystemClock};
use crate::traits::http::HttpClient;
use crate::traits::strategy::Strategy;
use crate::types::config::ExtractorConfig;
use crate::types::result::{Envelope, ExtractionResult};

/// Extracts media from post URLs.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
///
/// # Example
///
/// ```rust,ignore
/// use post_media::{Extractor, ExtractorConfig, ReqwestClient};
///
/// let config = ExtractorConfig::default();
/// let http = Arc::new(ReqwestClient::new(config.attempt_timeout())?);
/// let extractor = Extractor::new(http, config);
///
/// let result = extractor.extract("https://www.instagram.com/reel/ABC123/").await?;
/// for media in &result.media {
///     println!("{:?} {:?} {}", media.kind, media.quality, media.url);
/// }
/// ```
pub struct Extractor {
    config: Arc<ExtractorConfig>,
    chain: StrategyChain,
    pipeline: MediaPipeline,
}

impl Extractor {
    /// Every built-in strategy, in priority order.
    pub fn new(http: Arc<dyn HttpClient>, config: ExtractorConfig) -> Self {
        Self::with_kinds(http, config, &StrategyKind::ALL)
    }

    /// Only the given built-in strategies (still in priority order).
    pub fn with_kinds(
        http: Arc<dyn HttpClient>,
        config: ExtractorConfig,
        kinds: &[StrategyKind],
    ) -> Self {
        let config = Arc::new(config);
        let strategies = build_strategies(kinds, http, config.clone());
        Self::assemble(strategies, config)
    }

    /// A custom strategy list, tried in the given order.
    pub fn from_strategies(strategies: Vec<Box<dyn Strategy>>, config: ExtractorConfig) -> Self {
        Self::assemble(strategies, Arc::new(config))
    }

    fn assemble(strategies: Vec<Box<dyn Strategy>>, config: Arc<ExtractorConfig>) -> Self {
        let chain = StrategyChain::new(strategies)
            .with_attempt_timeout(config.attempt_timeout())
            .with_failure_delay(config.failure_delay());
        let pipeline = MediaPipeline::new(&config, Arc::new(SystemClock));
        Self {
            config,
            chain,
            pipeline,
        }
    }

    /// Timestamp results with `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.pipeline = MediaPipeline::new(&self.config, clock);
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Extract media for `raw_url`.
    ///
    /// Fails only with `InvalidSourceUrl`. Every other failure yields a
    /// result with empty media and `last_error` set.
    pub async fn extract(&self, raw_url: &str) -> Result<ExtractionResult> {
        self.extract_with_cancel(raw_url, CancellationToken::new())
            .await
    }

    /// Like [`extract`](Self::extract), aborting the in-flight attempt and
    /// skipping the rest once `cancel` fires.
    pub async fn extract_with_cancel(
        &self,
        raw_url: &str,
        cancel: CancellationToken,
    ) -> Result<ExtractionResult> {
        Ok(self.extract_report(raw_url, &cancel).await?.result)
    }

    /// Extract and keep every strategy outcome for diagnostics.
    pub async fn extract_report(
        &self,
        raw_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ChainReport> {
        let source = normalize(raw_url)?;
        info!(url = %source, post_type = %source.post_type(), "Extracting post media");
        Ok(self.chain.run(&source, &self.pipeline, cancel).await)
    }

    /// Extract and wrap the outcome in the wire envelope.
    ///
    /// `success` is false only for rejected input; an empty media list is
    /// still a successful call.
    pub async fn extract_envelope(
        &self,
        raw_url: &str,
        cancel: CancellationToken,
    ) -> Envelope<ExtractionResult> {
        match self.extract_with_cancel(raw_url, cancel).await {
            Ok(result) => {
                let timestamp = result.timestamp;
                Envelope::ok(result, timestamp)
            }
            Err(err) => Envelope::err(err.to_string(), self.pipeline.now()),
        }
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("chain", &self.chain)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
