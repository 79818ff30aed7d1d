//! Accord Provider Verifier CLI Tool
//!
//! Replays every interaction of one or more contract files against a running
//! provider and reports mismatches.
//!
//! Usage:
//!   accord-verify --provider-base-url http://localhost:3000 \
//!       --contract pacts/car_consumer-car_provider.json [OPTIONS]
//!
//! Exit codes:
//!   0 - every interaction passed
//!   1 - at least one interaction failed
//!   2 - configuration or contract loading error

use accord::config::VerifierConfig;
use accord::verifier::report::{print_header, print_report, print_summary};
use accord::{ContractArtifact, Verifier};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Accord Provider Verifier - replay contracts against a live provider
#[derive(Parser, Debug)]
#[command(name = "accord-verify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Contract file(s) to verify
    #[arg(short, long = "contract")]
    contracts: Vec<PathBuf>,

    /// Provider base URL
    #[arg(short = 'u', long, env = "ACCORD_PROVIDER_BASE_URL")]
    provider_base_url: Option<String>,

    /// YAML configuration file
    #[arg(short, long, env = "ACCORD_VERIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Request timeout in milliseconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Readiness poll attempts before the first request
    #[arg(long)]
    readiness_attempts: Option<u32>,

    /// Provider state setup URL
    #[arg(long)]
    provider_states_setup_url: Option<String>,

    /// Show unified diffs for multi-line mismatches
    #[arg(short, long)]
    verbose: bool,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = load_config(&args)?;
    let base_url = config
        .provider_base_url
        .clone()
        .context("No provider base URL given (--provider-base-url or provider_base_url)")?;
    if config.contracts.is_empty() {
        anyhow::bail!("No contracts given (--contract or contracts)");
    }

    let artifacts = config
        .contracts
        .iter()
        .map(|path| {
            ContractArtifact::load(path)
                .with_context(|| format!("Failed to load contract {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    print_header(&base_url, artifacts.len());
    let verifier = Verifier::new(&base_url, &config)?;
    let reports = verifier.verify_all(&artifacts).await;
    for report in &reports {
        print_report(report, args.verbose);
    }
    print_summary(&reports);

    Ok(reports.iter().all(|r| r.passed()))
}

/// File values first, then CLI flags on top.
fn load_config(args: &Args) -> anyhow::Result<VerifierConfig> {
    let mut config = match args.config {
        Some(ref path) => VerifierConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VerifierConfig::default(),
    };

    if let Some(ref url) = args.provider_base_url {
        config.provider_base_url = Some(url.clone());
    }
    if !args.contracts.is_empty() {
        config.contracts = args.contracts.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_ms = timeout;
    }
    if let Some(attempts) = args.readiness_attempts {
        config.readiness.attempts = attempts;
    }
    if let Some(ref url) = args.provider_states_setup_url {
        config.provider_states_setup_url = Some(url.clone());
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
