//! Accord stub server
//!
//! Serves the interactions of one or more contract files from a mock server,
//! so a consumer can be developed against a recorded contract.
//!
//! Usage:
//!   accord --contract pacts/car_consumer-car_provider.json --port 8080

use accord::{ContractArtifact, MockServer};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "accord")]
#[command(author, version, about = "Serve recorded contract interactions", long_about = None)]
struct Args {
    /// Contract file(s) to serve
    #[arg(short, long = "contract", required = true)]
    contracts: Vec<PathBuf>,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "ACCORD_HOST")]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, default_value = "8080", env = "ACCORD_PORT")]
    port: u16,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut interactions = Vec::new();
    for path in &args.contracts {
        let artifact = ContractArtifact::load(path)
            .with_context(|| format!("Failed to load contract {}", path.display()))?;
        info!(
            "Serving {} interaction(s) of {} -> {}",
            artifact.interactions.len(),
            artifact.consumer.name,
            artifact.provider.name
        );
        interactions.extend(artifact.interactions);
    }

    let server = MockServer::with_interactions(&args.host, args.port, interactions)
        .await
        .context("Failed to start stub server")?;
    info!("Stub server listening on {}", server.base_url());

    tokio::signal::ctrl_c().await.ok();

    let unmatched = server.unmatched_requests();
    if !unmatched.is_empty() {
        warn!("{} request(s) did not match any interaction", unmatched.len());
    }
    server.shutdown();
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
