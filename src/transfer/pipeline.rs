//! List, stage, and hand over: the transfer half of a draft run

use crate::credentials::CredentialBroker;
use crate::error::{Error, Result};
use crate::transfer::download::{DownloadReport, FileDownloader};
use crate::transfer::lister::RemoteDirectoryLister;
use crate::types::{Event, RemoteFile, Stage};
use crate::workspace::{Workspace, WorkspaceFactory};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Everything staged for one run
///
/// The manifest owns the workspace; whoever holds the manifest is
/// responsible for releasing it.
#[derive(Debug)]
pub struct TransferManifest {
    /// Workspace holding the written files
    pub workspace: Workspace,
    /// Every file entry that was listed
    pub files: Vec<RemoteFile>,
    /// Number of files listed (always `files.len()`)
    pub count: usize,
    /// Per-file outcomes
    pub report: DownloadReport,
}

impl TransferManifest {
    /// Number of files actually written
    pub fn written_count(&self) -> usize {
        self.report.written_count()
    }

    /// Local paths of the written files
    pub fn local_paths(&self) -> Vec<PathBuf> {
        self.report.local_paths()
    }
}

/// Runs listing and downloading for one remote folder
pub struct TransferPipeline {
    broker: Arc<CredentialBroker>,
    lister: RemoteDirectoryLister,
    downloader: FileDownloader,
    workspaces: WorkspaceFactory,
    event_tx: broadcast::Sender<Event>,
    #[cfg(test)]
    after_acquire: Option<Box<dyn Fn(&Workspace) + Send + Sync>>,
}

impl TransferPipeline {
    /// Assemble a pipeline from its parts
    pub fn new(
        broker: Arc<CredentialBroker>,
        lister: RemoteDirectoryLister,
        downloader: FileDownloader,
        workspaces: WorkspaceFactory,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            broker,
            lister,
            downloader,
            workspaces,
            event_tx,
            #[cfg(test)]
            after_acquire: None,
        }
    }

    /// Run `hook` on every workspace right after it is created
    #[cfg(test)]
    pub(crate) fn with_after_acquire(
        mut self,
        hook: impl Fn(&Workspace) + Send + Sync + 'static,
    ) -> Self {
        self.after_acquire = Some(Box::new(hook));
        self
    }

    /// Stage every file of `remote_path` in a fresh workspace
    ///
    /// The credential is refreshed up front, before anything else. No
    /// workspace is created when the folder holds no files. If a workspace
    /// was created but the batch cannot proceed, it is released before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialUnavailable`] if the up-front refresh fails
    /// - [`Error::RemoteFolderListingFailed`] if listing fails
    /// - [`Error::NoFilesFound`] if the folder has no file entries
    /// - [`Error::Io`] / [`Error::WorkspaceUnavailable`] for workspace failures
    pub async fn run(&self, remote_path: &str) -> Result<TransferManifest> {
        self.broker.force_refresh().await.inspect_err(|e| {
            error!(remote_path = %remote_path, error = %e, "could not obtain credential");
        })?;

        self.emit_stage(remote_path, Stage::Listing);
        let files = self.lister.list(remote_path).await.inspect_err(|e| {
            error!(remote_path = %remote_path, error = %e, "listing failed");
        })?;

        if files.is_empty() {
            info!(remote_path = %remote_path, "no files found");
            return Err(Error::NoFilesFound {
                path: remote_path.to_string(),
            });
        }

        let workspace = self.workspaces.acquire().await?;
        #[cfg(test)]
        if let Some(hook) = &self.after_acquire {
            hook(&workspace);
        }

        self.emit_stage(remote_path, Stage::Downloading);
        info!(
            remote_path = %remote_path,
            files = files.len(),
            workspace = ?workspace.root_dir(),
            "downloading files"
        );

        let report = match self.downloader.download_all(&files, &workspace).await {
            Ok(report) => report,
            Err(e) => {
                error!(remote_path = %remote_path, error = %e, "download batch aborted");
                if let Err(cleanup) = workspace.release().await {
                    warn!(error = %cleanup, "failed to release workspace after aborted batch");
                }
                return Err(e);
            }
        };

        for (file, reason) in report.skipped() {
            self.event_tx
                .send(Event::FileSkipped {
                    remote_path: remote_path.to_string(),
                    name: file.name.clone(),
                    reason: reason.to_string(),
                })
                .ok();
        }

        info!(
            remote_path = %remote_path,
            listed = files.len(),
            written = report.written_count(),
            "transfer finished"
        );

        Ok(TransferManifest {
            count: files.len(),
            files,
            workspace,
            report,
        })
    }

    fn emit_stage(&self, remote_path: &str, stage: Stage) {
        self.event_tx
            .send(Event::StageChanged {
                remote_path: remote_path.to_string(),
                stage,
            })
            .ok();
    }
}
