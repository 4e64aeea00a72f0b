//! Sequential strategy chain with short-circuit and best-so-far tracking.
//!
//! ```text
//! Pending -> TryingStrategy(i) -> Accepted(i)    (hd video found, stop)
//!                              -> Continuing(i)  (keep going)
//!         ... after the last strategy -> Exhausted
//! ```
//!
//! [`ChainRun`] holds the bookkeeping and is driven by [`StrategyChain::run`],
//! which owns timeouts, the failure delay and cancellation.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::pipeline::select::select_result;
use crate::pipeline::MediaPipeline;
use crate::traits::strategy::Strategy;
use crate::types::config::ExtractorConfig;
use crate::types::result::{ExtractionResult, StrategyOutcome};
use crate::types::source::SourceUrl;

/// Position of the chain in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// No strategy tried yet
    Pending,
    /// Strategy `i` is in flight
    TryingStrategy(usize),
    /// Strategy `i` produced an hd video; terminal
    Accepted(usize),
    /// Strategy `i` finished without being accepted
    Continuing(usize),
    /// Every strategy ran (or the run was cancelled) without acceptance; terminal
    Exhausted,
}

impl ChainState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Exhausted)
    }
}

/// Bookkeeping for one pass over the strategy list.
#[derive(Debug)]
pub struct ChainRun {
    state: ChainState,
    accepted: Option<ExtractionResult>,
    best_so_far: Option<ExtractionResult>,
    last_error: Option<ExtractError>,
    outcomes: Vec<StrategyOutcome>,
}

impl Default for ChainRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainRun {
    pub fn new() -> Self {
        Self {
            state: ChainState::Pending,
            accepted: None,
            best_so_far: None,
            last_error: None,
            outcomes: Vec::new(),
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn last_error(&self) -> Option<&ExtractError> {
        self.last_error.as_ref()
    }

    pub fn best_so_far(&self) -> Option<&ExtractionResult> {
        self.best_so_far.as_ref()
    }

    pub fn outcomes(&self) -> &[StrategyOutcome] {
        &self.outcomes
    }

    /// Enter `TryingStrategy(index)`.
    pub fn begin(&mut self, index: usize) -> ChainState {
        self.state = ChainState::TryingStrategy(index);
        self.state
    }

    /// Apply the outcome of strategy `index` and return the new state.
    ///
    /// A success whose media is empty counts as `NoParseableContent`.
    pub fn record(
        &mut self,
        index: usize,
        strategy: &str,
        outcome: Result<ExtractionResult>,
    ) -> ChainState {
        let outcome = match outcome {
            Ok(result) if !result.has_media() => Err(ExtractError::NoParseableContent(
                "strategy returned no media".into(),
            )),
            other => other,
        };

        match outcome {
            Ok(result) if result.has_hd_video() => {
                info!(strategy, media = result.media.len(), "Strategy accepted");
                self.outcomes
                    .push(StrategyOutcome::succeeded(strategy, result.clone()));
                self.accepted = Some(result);
                self.state = ChainState::Accepted(index);
            }
            Ok(result) => {
                debug!(
                    strategy,
                    media = result.media.len(),
                    "Strategy found media without hd video, continuing"
                );
                self.outcomes
                    .push(StrategyOutcome::succeeded(strategy, result.clone()));
                if self.best_so_far.is_none() {
                    self.best_so_far = Some(result);
                }
                self.state = ChainState::Continuing(index);
            }
            Err(error) => {
                warn!(strategy, error = %error, "Strategy failed");
                self.outcomes
                    .push(StrategyOutcome::failed(strategy, error.clone()));
                self.last_error = Some(error);
                self.state = ChainState::Continuing(index);
            }
        }

        self.state
    }

    /// Record cancellation between attempts.
    pub fn cancel(&mut self) {
        self.last_error = Some(ExtractError::Cancelled);
    }

    /// Close the run: anything not accepted becomes `Exhausted`.
    pub fn finish(&mut self) -> ChainState {
        if !matches!(self.state, ChainState::Accepted(_)) {
            self.state = ChainState::Exhausted;
        }
        self.state
    }

    /// Finish and hand the run to the result selector.
    pub fn into_report(mut self, source: &SourceUrl, pipeline: &MediaPipeline) -> ChainReport {
        let state = self.finish();
        let result = select_result(
            self.accepted,
            self.best_so_far,
            self.last_error.as_ref(),
            source,
            pipeline.now(),
        );
        ChainReport {
            result,
            state,
            outcomes: self.outcomes,
        }
    }
}

/// Final result plus the per-strategy trail that led to it.
#[derive(Debug)]
pub struct ChainReport {
    pub result: ExtractionResult,
    pub state: ChainState,
    pub outcomes: Vec<StrategyOutcome>,
}

/// Ordered list of strategies tried one at a time.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
    attempt_timeout: Duration,
    failure_delay: Duration,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        let defaults = ExtractorConfig::default();
        Self {
            strategies,
            attempt_timeout: defaults.attempt_timeout(),
            failure_delay: defaults.failure_delay(),
        }
    }

    /// Per-attempt deadline. Expiry counts as a network failure.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Pause after a failed attempt when another strategy follows.
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order until one is accepted, all are tried, or
    /// `cancel` fires. Never fails.
    pub async fn run(
        &self,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
        cancel: &CancellationToken,
    ) -> ChainReport {
        let mut run = ChainRun::new();
        let count = self.strategies.len();

        for (index, strategy) in self.strategies.iter().enumerate() {
            if cancel.is_cancelled() {
                run.cancel();
                break;
            }

            let name = strategy.name();
            run.begin(index);
            debug!(strategy = name, index, url = %source, "Trying strategy");

            let attempt = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = tokio::time::timeout(
                    self.attempt_timeout,
                    strategy.attempt(source, pipeline),
                ) => Some(outcome),
            };

            let outcome = match attempt {
                None => {
                    run.record(index, name, Err(ExtractError::Cancelled));
                    break;
                }
                Some(Ok(outcome)) => outcome,
                Some(Err(_)) => Err(ExtractError::NetworkFailure(format!(
                    "attempt timed out after {}ms",
                    self.attempt_timeout.as_millis()
                ))),
            };
            if run.record(index, name, outcome).is_terminal() {
                break;
            }
            let failed = run.outcomes().last().is_some_and(|o| !o.success);

            let has_next = index + 1 < count;
            if failed && has_next && !self.failure_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        run.cancel();
                        break;
                    }
                    _ = tokio::time::sleep(self.failure_delay) => {}
                }
            }
        }

        let report = run.into_report(source, pipeline);
        info!(
            url = %source,
            state = ?report.state,
            media = report.result.media.len(),
            attempts = report.outcomes.len(),
            "Strategy chain finished"
        );
        report
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyChain")
            .field("strategies", &self.names())
            .field("attempt_timeout", &self.attempt_timeout)
            .field("failure_delay", &self.failure_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::testing::{hd_video_result, image_result, FixedClock, MockStrategy};
    use std::sync::Arc;

    fn source() -> SourceUrl {
        normalize("https://www.instagram.com/reel/ABC123/").unwrap()
    }

    fn hd_video(url: &str) -> ExtractionResult {
        hd_video_result(&source(), url)
    }

    fn image(url: &str) -> ExtractionResult {
        image_result(&source(), url)
    }

    fn pipeline() -> MediaPipeline {
        MediaPipeline::new(&ExtractorConfig::default(), Arc::new(FixedClock::epoch()))
    }

    fn chain(strategies: Vec<MockStrategy>) -> StrategyChain {
        StrategyChain::new(
            strategies
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Strategy>)
                .collect(),
        )
        .with_failure_delay(Duration::ZERO)
    }

    #[test]
    fn test_run_state_transitions() {
        let mut run = ChainRun::new();
        assert_eq!(run.state(), ChainState::Pending);

        assert_eq!(run.begin(0), ChainState::TryingStrategy(0));
        let state = run.record(0, "a", Err(ExtractError::NetworkFailure("x".into())));
        assert_eq!(state, ChainState::Continuing(0));

        run.begin(1);
        let state = run.record(1, "b", Ok(image("https://cdn.example/a.jpg")));
        assert_eq!(state, ChainState::Continuing(1));
        assert!(run.best_so_far().is_some());

        run.begin(2);
        let state = run.record(2, "c", Ok(hd_video("https://cdn.example/v.mp4")));
        assert_eq!(state, ChainState::Accepted(2));
        assert_eq!(run.finish(), ChainState::Accepted(2));
        assert_eq!(run.outcomes().len(), 3);
    }

    #[test]
    fn test_first_best_so_far_is_kept() {
        let mut run = ChainRun::new();
        run.record(0, "a", Ok(image("https://cdn.example/first.jpg")));
        run.record(1, "b", Ok(image("https://cdn.example/second.jpg")));
        assert_eq!(
            run.best_so_far().unwrap().media[0].url,
            "https://cdn.example/first.jpg"
        );
        assert_eq!(run.finish(), ChainState::Exhausted);
    }

    #[test]
    fn test_empty_success_counts_as_failure() {
        let mut run = ChainRun::new();
        let empty = ExtractionResult::new(&source(), chrono::Utc::now());
        run.record(0, "a", Ok(empty));
        assert!(matches!(
            run.last_error(),
            Some(ExtractError::NoParseableContent(_))
        ));
        assert!(!run.outcomes()[0].success);
    }

    #[tokio::test]
    async fn test_short_circuit_on_hd_video() {
        let first = MockStrategy::succeeding("first", hd_video("https://cdn.example/v.mp4"));
        let second = MockStrategy::failing("second", ExtractError::NetworkFailure("x".into()));
        let second_calls = second.calls();

        let report = chain(vec![first, second])
            .run(&source(), &pipeline(), &CancellationToken::new())
            .await;

        assert_eq!(report.state, ChainState::Accepted(0));
        assert_eq!(second_calls.count(), 0);
        assert_eq!(report.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_placeholder() {
        let report = chain(vec![
            MockStrategy::failing("a", ExtractError::NetworkFailure("connection reset".into())),
            MockStrategy::failing("b", ExtractError::NetworkFailure("dns failure".into())),
        ])
        .run(&source(), &pipeline(), &CancellationToken::new())
        .await;

        assert_eq!(report.state, ChainState::Exhausted);
        assert!(report.result.media.is_empty());
        assert_eq!(
            report.result.last_error.as_deref(),
            Some("network failure: dns failure")
        );
        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_best_so_far_returned_after_exhaustion() {
        let report = chain(vec![
            MockStrategy::succeeding("images", image("https://cdn.example/a.jpg")),
            MockStrategy::failing("broken", ExtractError::RateLimited("wait".into())),
        ])
        .run(&source(), &pipeline(), &CancellationToken::new())
        .await;

        assert_eq!(report.state, ChainState::Exhausted);
        assert_eq!(report.result.media.len(), 1);
        assert_eq!(report.result.strategy.as_deref(), Some("images"));
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_network_failure() {
        let slow = MockStrategy::succeeding("slow", hd_video("https://cdn.example/v.mp4"))
            .with_delay(Duration::from_secs(5));

        let report = chain(vec![slow])
            .with_attempt_timeout(Duration::from_millis(20))
            .run(&source(), &pipeline(), &CancellationToken::new())
            .await;

        assert!(report.result.media.is_empty());
        assert!(matches!(
            report.outcomes[0].error,
            Some(ExtractError::NetworkFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining() {
        let slow = MockStrategy::succeeding("slow", hd_video("https://cdn.example/v.mp4"))
            .with_delay(Duration::from_secs(5));
        let next = MockStrategy::succeeding("next", hd_video("https://cdn.example/w.mp4"));
        let next_calls = next.calls();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = chain(vec![slow, next]).run(&source(), &pipeline(), &cancel).await;

        assert_eq!(report.state, ChainState::Exhausted);
        assert_eq!(next_calls.count(), 0);
        assert_eq!(report.result.last_error.as_deref(), Some("operation cancelled"));
    }

    #[tokio::test]
    async fn test_failure_delay_only_between_strategies() {
        let start = tokio::time::Instant::now();
        let only = MockStrategy::failing("only", ExtractError::NetworkFailure("x".into()));
        let report = chain(vec![only])
            .with_failure_delay(Duration::from_secs(10))
            .run(&source(), &pipeline(), &CancellationToken::new())
            .await;

        assert_eq!(report.state, ChainState::Exhausted);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
