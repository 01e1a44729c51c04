//! Batch download of remote files into a workspace
//!
//! Per-file problems never abort the batch: each file ends up as either
//! [`FileOutcome::Written`] or [`FileOutcome::Skipped`] with the reason.
//! Only a workspace that is no longer usable fails the whole call.

use crate::credentials::CredentialBroker;
use crate::error::{Error, Result};
use crate::remote::RemoteStore;
use crate::retry::with_credential_refresh;
use crate::types::RemoteFile;
use crate::workspace::Workspace;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a listed file was not written to the workspace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The listing entry carried no downloadable path
    NoRemotePath,
    /// The entry name is not a plain file name
    InvalidName,
    /// The download failed, including after one credential refresh
    DownloadFailed(String),
    /// The bytes arrived but could not be written locally
    WriteFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoRemotePath => f.write_str("entry has no remote path"),
            SkipReason::InvalidName => f.write_str("entry name is not a plain file name"),
            SkipReason::DownloadFailed(reason) => write!(f, "download failed: {reason}"),
            SkipReason::WriteFailed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

/// What happened to one listed file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file is staged at `local_path`
    Written {
        /// Location inside the workspace
        local_path: PathBuf,
        /// Number of bytes written
        bytes: u64,
    },
    /// The file was not staged
    Skipped(SkipReason),
}

/// A listed file together with its outcome
#[derive(Clone, Debug)]
pub struct FileTransfer {
    /// The listing entry
    pub file: RemoteFile,
    /// Its outcome
    pub outcome: FileOutcome,
}

/// Outcomes of one batch, in listing order
#[derive(Clone, Debug, Default)]
pub struct DownloadReport {
    /// One entry per input file
    pub transfers: Vec<FileTransfer>,
}

impl DownloadReport {
    /// Number of files written to the workspace
    pub fn written_count(&self) -> usize {
        self.transfers
            .iter()
            .filter(|t| matches!(t.outcome, FileOutcome::Written { .. }))
            .count()
    }

    /// Local paths of the written files, in listing order
    pub fn local_paths(&self) -> Vec<PathBuf> {
        self.transfers
            .iter()
            .filter_map(|t| match &t.outcome {
                FileOutcome::Written { local_path, .. } => Some(local_path.clone()),
                FileOutcome::Skipped(_) => None,
            })
            .collect()
    }

    /// Skipped files with their reasons
    pub fn skipped(&self) -> impl Iterator<Item = (&RemoteFile, &SkipReason)> {
        self.transfers.iter().filter_map(|t| match &t.outcome {
            FileOutcome::Skipped(reason) => Some((&t.file, reason)),
            FileOutcome::Written { .. } => None,
        })
    }

    /// Total bytes written
    pub fn bytes_written(&self) -> u64 {
        self.transfers
            .iter()
            .map(|t| match t.outcome {
                FileOutcome::Written { bytes, .. } => bytes,
                FileOutcome::Skipped(_) => 0,
            })
            .sum()
    }
}

/// Downloads listed files into a workspace with bounded concurrency
pub struct FileDownloader {
    store: Arc<dyn RemoteStore>,
    broker: Arc<CredentialBroker>,
    max_concurrent: usize,
}

impl FileDownloader {
    /// Create a downloader keeping at most `max_concurrent` transfers in flight
    pub fn new(
        store: Arc<dyn RemoteStore>,
        broker: Arc<CredentialBroker>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            broker,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Download every file in `files` into `workspace`
    ///
    /// Each file is fetched at most twice (once more after a credential
    /// refresh on 401). The report lists outcomes in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceUnavailable`] if the workspace was released
    /// or its directory is gone before the batch starts.
    pub async fn download_all(
        &self,
        files: &[RemoteFile],
        workspace: &Workspace,
    ) -> Result<DownloadReport> {
        let root = workspace.root_dir();
        let usable = !workspace.is_released()
            && tokio::fs::metadata(root)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
        if !usable {
            return Err(Error::WorkspaceUnavailable {
                path: root.to_path_buf(),
            });
        }

        let transfers: Vec<FileTransfer> = stream::iter(files.iter().cloned())
            .map(|file| self.transfer_one(file, root))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let report = DownloadReport { transfers };
        debug!(
            listed = files.len(),
            written = report.written_count(),
            bytes = report.bytes_written(),
            "batch download finished"
        );
        Ok(report)
    }

    async fn transfer_one(&self, file: RemoteFile, root: &Path) -> FileTransfer {
        let outcome = match self.fetch(&file, root).await {
            Ok((local_path, bytes)) => {
                debug!(name = %file.name, bytes, "file staged");
                FileOutcome::Written { local_path, bytes }
            }
            Err(reason) => {
                warn!(name = %file.name, reason = %reason, "file skipped");
                FileOutcome::Skipped(reason)
            }
        };
        FileTransfer { file, outcome }
    }

    async fn fetch(
        &self,
        file: &RemoteFile,
        root: &Path,
    ) -> std::result::Result<(PathBuf, u64), SkipReason> {
        let Some(remote_path) = file.remote_path.as_deref() else {
            return Err(SkipReason::NoRemotePath);
        };
        let Some(file_name) = local_file_name(&file.name) else {
            return Err(SkipReason::InvalidName);
        };

        let bytes = with_credential_refresh(&self.broker, |credential| async move {
            self.store.download_file(remote_path, &credential).await
        })
        .await
        .map_err(|e| SkipReason::DownloadFailed(e.to_string()))?;

        let local_path = root.join(file_name);
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(|e| SkipReason::WriteFailed(e.to_string()))?;

        Ok((local_path, bytes.len() as u64))
    }
}

/// Returns `name` if it can be used as a file name inside the workspace
fn local_file_name(name: &str) -> Option<&str> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    plain.then_some(name)
}
