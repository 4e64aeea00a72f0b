use anyhow::{Context, Result};
use dotenvy::dotenv;
use post_media::ExtractorConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Overall deadline when neither the environment nor a flag sets one.
const DEFAULT_DEADLINE_SECS: u64 = 90;

/// Default upstream request pace.
const DEFAULT_REQUESTS_PER_SECOND: u32 = 2;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub deadline: Duration,
    pub requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut extractor = ExtractorConfig::default();

        if let Some(secs) = parse::<u64>(&var, "POSTGRAB_ATTEMPT_TIMEOUT_SECS")? {
            extractor = extractor.with_attempt_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = parse::<u64>(&var, "POSTGRAB_FAILURE_DELAY_MS")? {
            extractor = extractor.with_failure_delay(Duration::from_millis(ms));
        }
        if let Some(relays) = var("POSTGRAB_RELAYS") {
            extractor = extractor.with_relays(
                relays
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty()),
            );
        }
        if let Some(doc_id) = var("POSTGRAB_GRAPHQL_DOC_ID") {
            extractor = extractor.with_graphql_doc_id(doc_id.trim());
        }
        if let Some(user_agent) = var("POSTGRAB_USER_AGENT") {
            extractor = extractor.with_user_agent(user_agent);
        }

        let deadline = parse::<u64>(&var, "POSTGRAB_DEADLINE_SECS")?
            .unwrap_or(DEFAULT_DEADLINE_SECS);
        let requests_per_second = parse::<u32>(&var, "POSTGRAB_REQUESTS_PER_SECOND")?
            .unwrap_or(DEFAULT_REQUESTS_PER_SECOND);

        Ok(Self {
            extractor,
            deadline: Duration::from_secs(deadline),
            requests_per_second,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{} must be a valid number", name))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.deadline, Duration::from_secs(90));
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.extractor.relays.len(), 2);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("POSTGRAB_ATTEMPT_TIMEOUT_SECS", "5"),
            ("POSTGRAB_FAILURE_DELAY_MS", "0"),
            ("POSTGRAB_RELAYS", "https://a.test/?u={url}, ,https://b.test/{url}"),
            ("POSTGRAB_GRAPHQL_DOC_ID", " 123 "),
            ("POSTGRAB_DEADLINE_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.extractor.attempt_timeout(), Duration::from_secs(5));
        assert_eq!(config.extractor.failure_delay(), Duration::ZERO);
        assert_eq!(
            config.extractor.relays,
            vec!["https://a.test/?u={url}", "https://b.test/{url}"]
        );
        assert_eq!(config.extractor.graphql_doc_id, "123");
        assert_eq!(config.deadline, Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_number_is_reported() {
        let err = config_from(&[("POSTGRAB_REQUESTS_PER_SECOND", "fast")]).unwrap_err();
        assert!(err.to_string().contains("POSTGRAB_REQUESTS_PER_SECOND"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("POSTGRAB_DEADLINE_SECS", "  ")]).unwrap();
        assert_eq!(config.deadline, Duration::from_secs(90));
    }
}
