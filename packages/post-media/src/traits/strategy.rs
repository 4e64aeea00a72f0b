//! Strategy trait: one upstream source of post data.
//!
//! Each strategy performs one network round trip (or a small fixed
//! sequence) and hands the raw payload to the [`MediaPipeline`]. Failures
//! are returned as values so the chain can decide whether to continue.

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::MediaPipeline;
use crate::types::{result::ExtractionResult, source::SourceUrl};

#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name used in outcomes and logs.
    fn name(&self) -> &str;

    /// Try to produce a result for `source`.
    ///
    /// Expected failures are `NetworkFailure`, `RateLimited` and
    /// `NoParseableContent`; all of them let the chain move on.
    async fn attempt(
        &self,
        source: &SourceUrl,
        pipeline: &MediaPipeline,
    ) -> Result<ExtractionResult>;
}
