//! Inventa Agent - host-side application inventory agent
//!
//! One invocation performs one inventory pass:
//! - Scan the discovery root's category directories
//! - Reconcile against declared inventory, drop ignored instances
//! - Produce and publish snapshots per instance type

use anyhow::{Context, Result};
use inventa_agent::agent::Agent;
use inventa_agent::config::AgentConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inventa_agent=info")),
        )
        .init();

    info!("Inventa agent starting...");

    let config = AgentConfig::load()
        .await
        .context("Failed to load agent configuration")?;

    let agent = Agent::new(config).context("Failed to initialize agent")?;

    let report = agent.run().await.context("Inventory run failed")?;
    if report.has_failures() {
        warn!(
            "run finished with {} produce and {} publish failures",
            report.producer_failures, report.publish_failures
        );
    }

    Ok(())
}
