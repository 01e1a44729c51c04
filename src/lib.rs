//! # portal-draft
//!
//! Stages the files of a remote property folder locally, asks an analyzer to
//! draft a portal listing from them, writes the draft back beside the source
//! files, and always removes the local staging directory afterwards.
//!
//! ## Pipeline
//!
//! 1. **Listing** - the folder is listed with a bearer credential kept fresh by
//!    the [`CredentialBroker`]; a rejected credential is refreshed once and the
//!    call retried once.
//! 2. **Downloading** - every file entry is fetched into a per-run
//!    [`Workspace`]; one bad file never aborts the batch.
//! 3. **Analyzing** - the staged paths go to an [`Analyzer`]; a failure turns
//!    into a placeholder text instead of an error.
//! 4. **Uploading** - the disclaimer-prefixed draft is written back with
//!    overwrite semantics.
//! 5. **Cleaning up** - the workspace is released on every path that created
//!    one.
//!
//! ## Quick Start
//!
//! ```no_run
//! use portal_draft::{Config, PipelineOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!
//!     let orchestrator = PipelineOrchestrator::from_config(&config)?;
//!
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let result = orchestrator.run("/PROPERTY SHOOTS/Edited/52 Thrale Road").await?;
//!     println!("{:?}: {:?}", result.status, result.result_text);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Analyzer capability and the OpenAI-compatible implementation
pub mod analyzer;
/// REST API module
pub mod api;
/// Disclaimer-prefixed draft artifact
pub mod artifact;
/// Configuration types
pub mod config;
/// Bearer credential caching and refresh
pub mod credentials;
/// Error types
pub mod error;
/// End-to-end draft flow
pub mod orchestrator;
/// Remote file store capability and the Dropbox implementation
pub mod remote;
/// Token to folder path lookup
pub mod resolver;
/// Refresh-once retry for calls rejected with 401
pub mod retry;
/// Listing, downloading, and uploading against the remote store
pub mod transfer;
/// Core types and events
pub mod types;
/// Ephemeral local staging directories
pub mod workspace;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use analyzer::{Analyzer, OpenAiAnalyzer};
pub use artifact::AnalysisArtifact;
pub use config::Config;
pub use credentials::{ClientSecrets, Credential, CredentialBroker};
pub use error::{ApiError, Error, ErrorDetail, RemoteError, Result, ToHttpStatus};
pub use orchestrator::{ANALYSIS_FAILED_TEXT, PipelineOrchestrator};
pub use remote::{DropboxClient, RemoteStore, TokenExchanger};
pub use resolver::{FolderPathResolver, InMemoryPathResolver, IssuedToken};
pub use transfer::{
    DownloadReport, FileDownloader, FileOutcome, FileTransfer, RemoteDirectoryLister,
    ResultUploader, SkipReason, TransferManifest, TransferPipeline,
};
pub use types::{DraftResult, DraftStatus, EntryKind, Event, RemoteFile, Stage};
pub use workspace::{Workspace, WorkspaceFactory};

/// Serve the API until a termination signal arrives, then drain in-flight requests.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use portal_draft::{Config, InMemoryPathResolver, PipelineOrchestrator, run_with_shutdown};
/// use portal_draft::api::AppState;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let orchestrator = Arc::new(PipelineOrchestrator::from_config(&config)?);
///     let resolver = Arc::new(InMemoryPathResolver::new(config.api.token_validity));
///     let state = AppState::new(orchestrator, resolver);
///
///     run_with_shutdown(state, &config.api).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(state: api::AppState, config: &config::ApiConfig) -> Result<()> {
    api::start_api_server(state, config, wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT, shutting down");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register unix signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("received Ctrl+C, shutting down");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C signal");
        }
    }
}
