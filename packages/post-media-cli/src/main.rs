mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use post_media::{Extractor, HttpClient, RateLimitedClient, ReqwestClient, StrategyKind};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Recover downloadable media URLs from a public post.
#[derive(Parser, Debug)]
#[command(name = "postgrab", version, about)]
struct Cli {
    /// Post, reel, TV or story URL
    url: String,

    /// Give up after this many seconds (overrides POSTGRAB_DEADLINE_SECS)
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Pretty-print the JSON envelope
    #[arg(long)]
    pretty: bool,

    /// Do not pause between failed strategies
    #[arg(long)]
    no_delay: bool,

    /// Only run these strategies (embed, direct, api, proxy); repeatable
    #[arg(long = "strategy", value_name = "NAME")]
    strategies: Vec<StrategyKind>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout stays a single JSON document
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,post_media=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(secs) = cli.deadline {
        config.deadline = Duration::from_secs(secs);
    }
    if cli.no_delay {
        config.extractor = config.extractor.with_failure_delay(Duration::ZERO);
    }

    let reqwest = ReqwestClient::new(config.extractor.attempt_timeout())
        .context("Failed to build HTTP client")?;
    let http: Arc<dyn HttpClient> =
        Arc::new(RateLimitedClient::new(reqwest, config.requests_per_second));

    let kinds = if cli.strategies.is_empty() {
        StrategyKind::ALL.to_vec()
    } else {
        cli.strategies
    };
    let extractor = Extractor::with_kinds(http, config.extractor, &kinds);
    tracing::debug!(strategies = ?extractor.strategy_names(), "Extractor ready");

    let cancel = CancellationToken::new();
    spawn_interrupt_watch(cancel.clone());
    spawn_deadline(cancel.clone(), config.deadline);

    let envelope = extractor.extract_envelope(&cli.url, cancel).await;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    }
    .context("Failed to serialize result")?;
    println!("{}", json);

    Ok(if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn spawn_interrupt_watch(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling extraction");
            cancel.cancel();
        }
    });
}

fn spawn_deadline(cancel: CancellationToken, deadline: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                tracing::warn!(
                    deadline_secs = deadline.as_secs(),
                    "Deadline reached, cancelling extraction"
                );
                cancel.cancel();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeatable_strategies() {
        let cli = Cli::try_parse_from([
            "postgrab",
            "https://www.instagram.com/p/ABC123/",
            "--strategy",
            "direct",
            "--strategy",
            "oembed",
            "--no-delay",
        ])
        .unwrap();

        assert_eq!(cli.strategies, vec![StrategyKind::Direct, StrategyKind::Embed]);
        assert!(cli.no_delay);
        assert!(!cli.pretty);
        assert_eq!(cli.deadline, None);
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        let parsed = Cli::try_parse_from([
            "postgrab",
            "https://www.instagram.com/p/ABC123/",
            "--strategy",
            "carrier-pigeon",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
