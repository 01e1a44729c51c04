//! portal-draft server
//!
//! Reads configuration from the environment (and `.env` if present), then
//! serves the draft API until SIGINT or SIGTERM.

use portal_draft::api::AppState;
use portal_draft::{Config, InMemoryPathResolver, PipelineOrchestrator, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in deployed environments
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    config.validate()?;

    let orchestrator = Arc::new(PipelineOrchestrator::from_config(&config)?);
    let resolver = Arc::new(InMemoryPathResolver::new(config.api.token_validity));
    let state = AppState::new(orchestrator, resolver);

    run_with_shutdown(state, &config.api).await?;
    Ok(())
}
