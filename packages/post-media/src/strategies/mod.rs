//! Built-in strategies, in priority order.
//!
//! | kind    | upstream                           | calls            |
//! |---------|------------------------------------|------------------|
//! | `embed` | oEmbed JSON                        | 1                |
//! | `direct`| post page with mobile headers      | 1                |
//! | `api`   | JSON endpoints, then GraphQL POST  | up to N + 1      |
//! | `proxy` | post page through third-party relays | up to one per relay |

mod api;
mod direct;
mod embed;
mod proxy;

pub use api::ApiProbeStrategy;
pub use direct::DirectPageStrategy;
pub use embed::EmbedStrategy;
pub use proxy::ProxyRelayStrategy;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ExtractError, Result};
use crate::traits::http::{HttpClient, HttpResponse};
use crate::traits::strategy::Strategy;
use crate::types::config::ExtractorConfig;

/// Headers a desktop browser sends for a top-level page load.
pub(crate) fn browser_headers(user_agent: &str) -> Vec<(String, String)> {
    [
        ("User-Agent", user_agent),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Map an upstream response to a strategy error when it is unusable.
///
/// Blocking phrases win over the status code, since the upstream often
/// answers a block with 200.
pub(crate) fn check_response(response: &HttpResponse, config: &ExtractorConfig) -> Result<()> {
    if let Some(phrase) = response.contains_any(&config.blocking_phrases) {
        return Err(ExtractError::RateLimited(format!(
            "blocking phrase {:?} from {}",
            phrase, response.url
        )));
    }

    if response.status == 429 {
        return Err(ExtractError::RateLimited(format!(
            "HTTP 429 from {}",
            response.url
        )));
    }

    if !response.is_success() {
        return Err(ExtractError::NetworkFailure(format!(
            "HTTP {} from {}",
            response.status, response.url
        )));
    }

    Ok(())
}

/// Built-in strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Embed,
    Direct,
    Api,
    Proxy,
}

impl StrategyKind {
    /// Every kind, in chain priority order.
    pub const ALL: [StrategyKind; 4] = [Self::Embed, Self::Direct, Self::Api, Self::Proxy];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Direct => "direct",
            Self::Api => "api",
            Self::Proxy => "proxy",
        }
    }

    /// Construct the strategy for this kind.
    pub fn build(
        &self,
        http: Arc<dyn HttpClient>,
        config: Arc<ExtractorConfig>,
    ) -> Box<dyn Strategy> {
        match self {
            Self::Embed => Box::new(EmbedStrategy::new(http, config)),
            Self::Direct => Box::new(DirectPageStrategy::new(http, config)),
            Self::Api => Box::new(ApiProbeStrategy::new(http, config)),
            Self::Proxy => Box::new(ProxyRelayStrategy::new(http, config)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embed" | "oembed" => Ok(Self::Embed),
            "direct" | "page" => Ok(Self::Direct),
            "api" => Ok(Self::Api),
            "proxy" | "relay" => Ok(Self::Proxy),
            other => Err(format!(
                "unknown strategy '{}', expected one of: embed, direct, api, proxy",
                other
            )),
        }
    }
}

/// Build the given kinds in fixed priority order, ignoring duplicates and
/// the order they were passed in.
pub fn build_strategies(
    kinds: &[StrategyKind],
    http: Arc<dyn HttpClient>,
    config: Arc<ExtractorConfig>,
) -> Vec<Box<dyn Strategy>> {
    StrategyKind::ALL
        .iter()
        .filter(|kind| kinds.contains(kind))
        .map(|kind| kind.build(http.clone(), config.clone()))
        .collect()
}

/// All built-in strategies in priority order.
pub fn default_strategies(
    http: Arc<dyn HttpClient>,
    config: Arc<ExtractorConfig>,
) -> Vec<Box<dyn Strategy>> {
    build_strategies(&StrategyKind::ALL, http, config)
}
