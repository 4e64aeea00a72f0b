//! Post Media Extraction Library
//!
//! Given the public URL of a social-media post, recovers downloadable media
//! URLs (videos and images), author and caption metadata, and a coarse
//! post-type classification.
//!
//! # How it works
//!
//! An ordered chain of independent strategies (oEmbed lookup, direct page
//! fetch, API endpoint probing, proxy relays) is tried one at a time. Each
//! strategy's raw payload goes through the same pipeline:
//!
//! 1. ordered pattern rules pull candidate URLs and metadata
//! 2. URLs are unescaped, stripped to essential query params, validated
//!    against the CDN host space and deduplicated
//! 3. quality is inferred from URL markers and media is ordered
//!
//! The first strategy that yields an hd video wins. Otherwise the first
//! non-empty result is kept, and total failure is an empty result carrying
//! the last error. Only an unrecognized input URL is reported as an error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use post_media::{Extractor, ExtractorConfig, ReqwestClient};
//! use std::sync::Arc;
//!
//! let config = ExtractorConfig::default();
//! let http = Arc::new(ReqwestClient::new(config.attempt_timeout())?);
//! let extractor = Extractor::new(http, config);
//!
//! let result = extractor.extract("https://www.instagram.com/reel/ABC123/").await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability abstractions (HttpClient, Clock, Strategy)
//! - [`types`] - Source URLs, media candidates, results, config
//! - [`pipeline`] - Normalizer, pattern rules, cleaner, quality, chain
//! - [`strategies`] - Built-in strategies
//! - [`http`] - HttpClient implementations
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod extractor;
pub mod http;
pub mod pipeline;
pub mod strategies;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractError, FetchError, FetchResult, Result};
pub use extractor::Extractor;
pub use traits::{
    clock::{Clock, SystemClock},
    http::{HttpClient, HttpRequest, HttpResponse, Method},
    strategy::Strategy,
};
pub use types::{
    config::ExtractorConfig,
    media::{MediaCandidate, MediaKind, Quality, RawCandidate},
    result::{Envelope, ExtractionResult, StrategyOutcome},
    source::{PostType, SourceUrl},
};

// Re-export pipeline components
pub use pipeline::{
    is_valid, normalize, select_result, ChainReport, ChainState, Extracted, MediaPipeline,
    PatternExtractor, StrategyChain, UrlCleaner,
};

// Re-export strategies
pub use strategies::{
    build_strategies, default_strategies, ApiProbeStrategy, DirectPageStrategy, EmbedStrategy,
    ProxyRelayStrategy, StrategyKind,
};

// Re-export HTTP clients
pub use http::{RateLimitedClient, RateLimitedClientBuilder, ReqwestClient};

// Re-export testing utilities
pub use testing::{FixedClock, MockHttpClient, MockStrategy};
