//! REST API server module
//!
//! A thin dispatch surface over [`PipelineOrchestrator`](crate::PipelineOrchestrator):
//! each request runs one draft to completion and answers with its result.

use crate::Result;
use crate::config::ApiConfig;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `POST /drafts` - Run a draft for `{ "path": "/folder" }`
/// - `POST /drafts/token` - Run a draft for the folder registered to `{ "token": "..." }`
/// - `POST /tokens` - Issue a request token for `{ "path": "/folder" }`
/// - `GET /health` - Health check
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let router = Router::new()
        .route("/drafts", post(routes::create_draft))
        .route("/drafts/token", post(routes::create_draft_from_token))
        .route("/tokens", post(routes::issue_token))
        .route("/health", get(routes::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        router.layer(build_cors_layer(&config.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server and serve until `shutdown` resolves
///
/// In-flight requests are allowed to finish once `shutdown` completes.
///
/// # Example
///
/// ```no_run
/// use portal_draft::api::{AppState, start_api_server};
/// use portal_draft::{Config, InMemoryPathResolver, PipelineOrchestrator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let orchestrator = Arc::new(PipelineOrchestrator::from_config(&config)?);
/// let resolver = Arc::new(InMemoryPathResolver::new(config.api.token_validity));
/// let state = AppState::new(orchestrator, resolver);
///
/// start_api_server(state, &config.api, async {
///     tokio::signal::ctrl_c().await.ok();
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(state: AppState, config: &ApiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.bind_address;

    tracing::info!(address = %bind_address, "starting API server");

    let app = create_router(state, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().map_err(crate::error::Error::Io)?,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
