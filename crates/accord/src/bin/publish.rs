//! Accord contract publisher
//!
//! Uploads contract files to a broker under a consumer version and tags that
//! version.
//!
//! Usage:
//!   accord-publish --broker-url http://broker.local --consumer-version 1.0.0 \
//!       --tag main pacts/car_consumer-car_provider.json
//!   accord-publish --config verifier.yaml --consumer-version 1.0.0 pacts/*.json

use accord::broker::BrokerClient;
use accord::config::BrokerConfig;
use accord::{ContractArtifact, VerifierConfig};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "accord-publish")]
#[command(author, version, about = "Publish contracts to a broker", long_about = None)]
struct Args {
    /// Contract files to publish
    #[arg(required = true)]
    contracts: Vec<PathBuf>,

    /// Configuration file; its `broker` section fills in missing flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker base URL
    #[arg(short, long, env = "ACCORD_BROKER_URL")]
    broker_url: Option<String>,

    /// Bearer token for the broker
    #[arg(long, env = "ACCORD_BROKER_TOKEN", hide_env_values = true)]
    broker_token: Option<String>,

    /// Consumer application version
    #[arg(long)]
    consumer_version: String,

    /// Tag(s) to apply to the consumer version
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{RED}Error:{RESET} {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    if args.consumer_version.trim().is_empty() {
        anyhow::bail!("--consumer-version must not be empty");
    }
    let file = match &args.config {
        Some(path) => Some(
            VerifierConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
        ),
        None => None,
    };
    let broker = BrokerConfig::resolve(
        args.broker_url.clone(),
        args.broker_token.clone(),
        file.as_ref().and_then(|c| c.broker.as_ref()),
    )?;
    info!("Publishing to broker at {}", broker.url);
    let client = BrokerClient::new(&broker.url, broker.token)?;

    for path in &args.contracts {
        let artifact = ContractArtifact::load(path)
            .with_context(|| format!("Failed to load contract {}", path.display()))?;
        client
            .publish(&artifact, &args.consumer_version, &args.tags)
            .await
            .with_context(|| format!("Failed to publish {}", path.display()))?;
        println!(
            "{GREEN}✓{RESET} {} -> {} version {}",
            artifact.consumer.name, artifact.provider.name, args.consumer_version
        );
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
