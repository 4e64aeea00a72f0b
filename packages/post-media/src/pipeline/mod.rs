//! Payload processing and the strategy chain.
//!
//! A strategy hands its raw payload to [`MediaPipeline::process`]:
//! pattern extraction, URL cleaning, quality classification and ordering.
//! [`chain::StrategyChain`] then decides which strategy's result wins.

pub mod chain;
pub mod clean;
pub mod extract;
pub mod normalize;
pub mod patterns;
pub mod quality;
pub mod select;
pub mod structured;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{ExtractError, Result};
use crate::traits::clock::Clock;
use crate::types::config::ExtractorConfig;
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

pub use chain::{ChainReport, ChainState, StrategyChain};
pub use clean::UrlCleaner;
pub use extract::{Extracted, PatternExtractor};
pub use normalize::{is_valid, normalize};
pub use select::select_result;

/// Shared, stateless processing stages used by every strategy.
#[derive(Clone)]
pub struct MediaPipeline {
    extractor: PatternExtractor,
    cleaner: UrlCleaner,
    clock: Arc<dyn Clock>,
}

impl MediaPipeline {
    pub fn new(config: &ExtractorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            extractor: PatternExtractor::new(),
            cleaner: UrlCleaner::new(config),
            clock,
        }
    }

    /// Replace the extraction rule set.
    pub fn with_extractor(mut self, extractor: PatternExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn extractor(&self) -> &PatternExtractor {
        &self.extractor
    }

    /// Run the pattern extractor only.
    pub fn extract(&self, payload: &str, source: &SourceUrl) -> Extracted {
        self.extractor.extract(payload, source.post_type())
    }

    /// Clean, classify and order already-extracted fields into a result.
    ///
    /// Fails with `NoParseableContent` when no candidate survives cleaning.
    pub fn finish(
        &self,
        source: &SourceUrl,
        extracted: Extracted,
        strategy: &str,
    ) -> Result<ExtractionResult> {
        let cleaned = self.cleaner.clean_all(&extracted.media);
        let media = quality::finalize(cleaned);

        if media.is_empty() {
            return Err(ExtractError::NoParseableContent(format!(
                "{} candidates, none usable (rules: {})",
                extracted.media.len(),
                if extracted.matched_rules.is_empty() {
                    "none".to_string()
                } else {
                    extracted.matched_rules.join(", ")
                }
            )));
        }

        Ok(ExtractionResult {
            title: extracted.title,
            author: extracted.author,
            description: extracted.description,
            media,
            ..ExtractionResult::new(source, self.now())
        }
        .with_strategy(strategy))
    }

    /// Extract and finish a raw payload in one step.
    pub fn process(
        &self,
        payload: &str,
        source: &SourceUrl,
        strategy: &str,
    ) -> Result<ExtractionResult> {
        let extracted = self.extract(payload, source);
        self.finish(source, extracted, strategy)
    }
}

impl std::fmt::Debug for MediaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPipeline")
            .field("rules", &self.extractor.rules().len())
            .field("cleaner", &self.cleaner)
            .finish()
    }
}
