//! Result selection once the chain has stopped.

use chrono::{DateTime, Utc};

use crate::error::ExtractError;
use crate::types::result::ExtractionResult;
use crate::types::source::SourceUrl;

/// Pick the final result: the accepted one, else the best non-empty one
/// seen, else an empty-media placeholder carrying `last_error`.
///
/// Never fails. Total failure shows up as empty media.
pub fn select_result(
    accepted: Option<ExtractionResult>,
    best_so_far: Option<ExtractionResult>,
    last_error: Option<&ExtractError>,
    source: &SourceUrl,
    now: DateTime<Utc>,
) -> ExtractionResult {
    accepted
        .or(best_so_far)
        .unwrap_or_else(|| ExtractionResult::placeholder(source, now, last_error))
}
