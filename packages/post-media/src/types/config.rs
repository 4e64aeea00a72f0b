//! Configuration for extraction and upstream access.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder replaced by the (percent-encoded) post URL in templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Placeholder replaced by the post shortcode in templates.
pub const SHORTCODE_PLACEHOLDER: &str = "{shortcode}";

/// Configuration for the strategy chain and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Deadline for a single strategy attempt (milliseconds).
    ///
    /// An expired attempt counts as a network failure. Default: 15000.
    pub attempt_timeout_ms: u64,

    /// Pause after a failed attempt before the next strategy (milliseconds).
    ///
    /// Default: 750. Zero disables the pause.
    pub failure_delay_ms: u64,

    /// Desktop browser user-agent, used for API and relay requests.
    pub user_agent: String,

    /// Mobile browser user-agent, used for the direct page fetch.
    pub mobile_user_agent: String,

    /// oEmbed endpoint; `{url}` is replaced by the encoded post URL.
    pub oembed_endpoint: String,

    /// GET endpoints probed by the alternate-API strategy, in order.
    ///
    /// `{shortcode}` is replaced by the post shortcode.
    pub api_endpoints: Vec<String>,

    /// Web GraphQL endpoint probed with a form POST after the GET probes.
    pub graphql_endpoint: Option<String>,

    /// Persisted query id for the GraphQL media lookup. Rotates upstream.
    pub graphql_doc_id: String,

    /// Web app id sent as `X-IG-App-ID`.
    pub app_id: String,

    /// Relay URL templates, tried in order; `{url}` is the encoded post URL.
    pub relays: Vec<String>,

    /// A relay response shorter than this (bytes) counts as a failure.
    pub min_relay_payload: usize,

    /// Body phrases that mean the upstream is throttling us.
    pub blocking_phrases: Vec<String>,

    /// Host suffixes accepted as media CDN hosts.
    pub cdn_hosts: Vec<String>,

    /// Query parameters kept on media URLs; everything else is stripped.
    pub keep_query_params: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 15_000,
            failure_delay_ms: 750,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            mobile_user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1".to_string(),
            oembed_endpoint: "https://api.instagram.com/oembed/?url={url}".to_string(),
            api_endpoints: vec![
                "https://www.instagram.com/p/{shortcode}/?__a=1&__d=dis".to_string(),
                "https://www.instagram.com/p/{shortcode}/embed/captioned/".to_string(),
            ],
            graphql_endpoint: Some("https://www.instagram.com/api/graphql".to_string()),
            graphql_doc_id: "8845758582119845".to_string(),
            app_id: "936619743392459".to_string(),
            relays: vec![
                "https://api.allorigins.win/raw?url={url}".to_string(),
                "https://corsproxy.io/?url={url}".to_string(),
            ],
            min_relay_payload: 1000,
            blocking_phrases: vec![
                "Please wait a few minutes before you try again".to_string(),
                "\"spam\":true".to_string(),
            ],
            cdn_hosts: vec!["cdninstagram.com".to_string(), "fbcdn.net".to_string()],
            keep_query_params: [
                "oh", "oe", "_nc_ht", "_nc_cat", "_nc_ohc", "_nc_oc", "_nc_sid", "efg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ExtractorConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }

    /// Set the per-attempt deadline.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Set the pause after failed attempts.
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay_ms = saturating_millis(delay);
        self
    }

    /// Replace the relay templates.
    pub fn with_relays(mut self, relays: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.relays = relays.into_iter().map(|r| r.into()).collect();
        self
    }

    /// Accept an additional CDN host suffix.
    pub fn with_cdn_host(mut self, host: impl Into<String>) -> Self {
        self.cdn_hosts.push(host.into());
        self
    }

    /// Set the GraphQL persisted query id.
    pub fn with_graphql_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.graphql_doc_id = doc_id.into();
        self
    }

    /// Set the desktop user-agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the oEmbed endpoint template.
    pub fn with_oembed_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.oembed_endpoint = endpoint.into();
        self
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Fill a URL template with the encoded post URL and the shortcode.
pub fn fill_template(template: &str, post_url: &str, shortcode: Option<&str>) -> String {
    let filled = template.replace(URL_PLACEHOLDER, &urlencoding::encode(post_url));
    match shortcode {
        Some(code) => filled.replace(SHORTCODE_PLACEHOLDER, code),
        None => filled,
    }
}
