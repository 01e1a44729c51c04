//! One draft run from listing to cleanup
//!
//! ```text
//! Listing -> Downloading -> Analyzing -> Uploading -> CleaningUp -> Done
//!    \            \
//!     +------------+--> Errored
//! ```
//!
//! A run that exceeds its time budget reports `CleaningUp` then `Errored`.
//!
//! Once the transfer pipeline has handed over a manifest, nothing that
//! happens afterwards is an error: analysis and upload failures are folded
//! into the [`DraftResult`], and the workspace is released exactly once
//! before the run reports `Done`.

use crate::analyzer::{Analyzer, OpenAiAnalyzer};
use crate::artifact::AnalysisArtifact;
use crate::config::Config;
use crate::credentials::CredentialBroker;
use crate::error::{Error, Result};
use crate::remote::{DropboxClient, RemoteStore, TokenExchanger};
use crate::transfer::{
    FileDownloader, RemoteDirectoryLister, ResultUploader, TransferManifest, TransferPipeline,
};
use crate::types::{DraftResult, DraftStatus, Event, Stage};
use crate::workspace::{Workspace, WorkspaceFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Draft text used when the analyzer fails
pub const ANALYSIS_FAILED_TEXT: &str = "Failed to analyze images";

/// Runs the whole draft flow for one remote folder at a time
///
/// An orchestrator is cheap to share behind `Arc`; concurrent runs only
/// share the credential broker.
pub struct PipelineOrchestrator {
    transfer: TransferPipeline,
    analyzer: Arc<dyn Analyzer>,
    uploader: ResultUploader,
    artifact_file_name: String,
    pipeline_timeout: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl PipelineOrchestrator {
    /// Wire the pipeline around the given capabilities
    pub fn new(
        store: Arc<dyn RemoteStore>,
        exchanger: Arc<dyn TokenExchanger>,
        analyzer: Arc<dyn Analyzer>,
        config: &Config,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        let broker = Arc::new(CredentialBroker::new(exchanger, &config.remote));

        let transfer = TransferPipeline::new(
            broker.clone(),
            RemoteDirectoryLister::new(store.clone(), broker.clone()),
            FileDownloader::new(
                store.clone(),
                broker.clone(),
                config.transfer.max_concurrent_downloads,
            ),
            WorkspaceFactory::new(&config.workspace),
            event_tx.clone(),
        );
        let uploader = ResultUploader::new(store, broker, config.transfer.result_subfolder.clone());

        Self {
            transfer,
            analyzer,
            uploader,
            artifact_file_name: config.transfer.artifact_file_name.clone(),
            pipeline_timeout: config.transfer.pipeline_timeout,
            event_tx,
        }
    }

    /// Build the production pipeline: Dropbox for storage, OpenAI for analysis
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the analyzer key is missing, or
    /// [`Error::Network`] if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dropbox = Arc::new(DropboxClient::new(&config.remote)?);
        let analyzer = Arc::new(OpenAiAnalyzer::new(&config.analyzer)?);

        info!(
            region = %config.remote.region,
            model = %config.analyzer.model,
            max_concurrent_downloads = config.transfer.max_concurrent_downloads,
            "pipeline configured"
        );

        Ok(Self::new(dropbox.clone(), dropbox, analyzer, config))
    }

    /// Subscribe to pipeline events
    ///
    /// Events emitted before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Produce a draft for `remote_path`
    ///
    /// An empty folder is a normal outcome ([`DraftStatus::NoFilesFound`]).
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialUnavailable`] / [`Error::RemoteFolderListingFailed`]
    ///   if the folder cannot be listed
    /// - [`Error::Timeout`] if the run exceeds the configured budget; the
    ///   workspace is still removed
    pub async fn run(&self, remote_path: &str) -> Result<DraftResult> {
        info!(remote_path = %remote_path, "draft run started");

        // The abandoned run is dropped with this statement, and with it any
        // workspace it held; `Workspace`'s drop guard removes the directory.
        let outcome =
            tokio::time::timeout(self.pipeline_timeout, self.run_to_completion(remote_path)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                error!(
                    remote_path = %remote_path,
                    timeout = ?self.pipeline_timeout,
                    "draft run timed out"
                );
                self.emit_stage(remote_path, Stage::CleaningUp);
                self.emit_stage(remote_path, Stage::Errored);
                Err(Error::Timeout(self.pipeline_timeout))
            }
        }
    }

    async fn run_to_completion(&self, remote_path: &str) -> Result<DraftResult> {
        let manifest = match self.transfer.run(remote_path).await {
            Ok(manifest) => manifest,
            Err(Error::NoFilesFound { .. }) => {
                self.emit_stage(remote_path, Stage::Done);
                self.emit_completed(remote_path, DraftStatus::NoFilesFound);
                return Ok(DraftResult::no_files(remote_path));
            }
            Err(e) => {
                self.emit_stage(remote_path, Stage::Errored);
                return Err(e);
            }
        };

        let result = self.process(remote_path, &manifest).await;

        self.emit_stage(remote_path, Stage::CleaningUp);
        self.cleanup(&manifest.workspace).await;

        self.emit_stage(remote_path, Stage::Done);
        self.emit_completed(remote_path, result.status);
        info!(
            remote_path = %remote_path,
            status = ?result.status,
            files_written = result.files_written,
            "draft run finished"
        );
        Ok(result)
    }

    /// Analyze and upload; every failure here is absorbed into the result
    async fn process(&self, remote_path: &str, manifest: &TransferManifest) -> DraftResult {
        let mut result = DraftResult {
            remote_path: remote_path.to_string(),
            status: DraftStatus::NothingTransferred,
            result_text: None,
            files_listed: manifest.count,
            files_written: manifest.written_count(),
            uploaded_to: None,
        };

        if result.files_written == 0 {
            warn!(
                remote_path = %remote_path,
                listed = manifest.count,
                "no files transferred, skipping analysis"
            );
            return result;
        }

        self.emit_stage(remote_path, Stage::Analyzing);
        let (text, status) = match self.analyzer.analyze(&manifest.local_paths()).await {
            Ok(text) => (text, DraftStatus::Completed),
            Err(e) => {
                warn!(
                    remote_path = %remote_path,
                    analyzer = self.analyzer.name(),
                    error = %e,
                    "analysis failed, using placeholder text"
                );
                self.event_tx
                    .send(Event::AnalysisFailed {
                        remote_path: remote_path.to_string(),
                        error: e.to_string(),
                    })
                    .ok();
                (ANALYSIS_FAILED_TEXT.to_string(), DraftStatus::AnalysisFailed)
            }
        };

        self.emit_stage(remote_path, Stage::Uploading);
        match self
            .write_back(&text, &manifest.workspace, remote_path)
            .await
        {
            Ok(destination) => result.uploaded_to = Some(destination),
            Err(e) => {
                warn!(remote_path = %remote_path, error = %e, "draft not written back");
                self.event_tx
                    .send(Event::UploadFailed {
                        remote_path: remote_path.to_string(),
                        error: e.to_string(),
                    })
                    .ok();
            }
        }

        result.status = status;
        result.result_text = Some(text);
        result
    }

    async fn write_back(
        &self,
        text: &str,
        workspace: &Workspace,
        remote_path: &str,
    ) -> Result<String> {
        let local = AnalysisArtifact::new(text)
            .write_to(workspace.root_dir(), &self.artifact_file_name)
            .await
            .map_err(|e| Error::Upload {
                destination: remote_path.to_string(),
                reason: format!("writing artifact: {e}"),
            })?;
        self.uploader.upload(&local, remote_path).await
    }

    async fn cleanup(&self, workspace: &Workspace) {
        if let Err(e) = workspace.release().await {
            warn!(path = ?workspace.root_dir(), error = %e, "workspace cleanup failed");
            self.event_tx
                .send(Event::CleanupFailed {
                    path: workspace.root_dir().to_path_buf(),
                    error: e.to_string(),
                })
                .ok();
        }
    }

    fn emit_stage(&self, remote_path: &str, stage: Stage) {
        info!(remote_path = %remote_path, stage = %stage, "stage changed");
        self.event_tx
            .send(Event::StageChanged {
                remote_path: remote_path.to_string(),
                stage,
            })
            .ok();
    }

    fn emit_completed(&self, remote_path: &str, status: DraftStatus) {
        self.event_tx
            .send(Event::Completed {
                remote_path: remote_path.to_string(),
                status,
            })
            .ok();
    }
}
