//! Core types for portal-draft

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of an entry returned by a remote folder listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A downloadable file
    File,
    /// A folder (never handed downstream)
    Folder,
}

/// Snapshot of one remote entry at listing time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Entry name, used as the local file name
    pub name: String,
    /// Path usable for download; `None` means the entry cannot be fetched
    pub remote_path: Option<String>,
    /// Entry kind
    pub kind: EntryKind,
}

impl RemoteFile {
    /// Create a file entry with a downloadable path
    pub fn file(name: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_path: Some(remote_path.into()),
            kind: EntryKind::File,
        }
    }

    /// Create a folder entry
    pub fn folder(name: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_path: Some(remote_path.into()),
            kind: EntryKind::Folder,
        }
    }

    /// Returns true for file entries
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Stage of a pipeline run
///
/// Runs advance strictly in declaration order; `Errored` is reachable from
/// any of the working stages and `CleaningUp` always precedes `Done` once a
/// workspace exists. A timed-out run reports `CleaningUp` before `Errored`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Listing the remote folder
    Listing,
    /// Transferring files into the workspace
    Downloading,
    /// Waiting on the analyzer
    Analyzing,
    /// Writing the artifact back to the remote store
    Uploading,
    /// Removing the workspace
    CleaningUp,
    /// Finished
    Done,
    /// A run-aborting failure occurred
    Errored,
}

impl Stage {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Listing => "listing",
            Stage::Downloading => "downloading",
            Stage::Analyzing => "analyzing",
            Stage::Uploading => "uploading",
            Stage::CleaningUp => "cleaning_up",
            Stage::Done => "done",
            Stage::Errored => "errored",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted while a pipeline run progresses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The run moved to a new stage
    StageChanged {
        /// Remote folder being processed
        remote_path: String,
        /// Stage entered
        stage: Stage,
    },

    /// A listed file was not written to the workspace
    FileSkipped {
        /// Remote folder being processed
        remote_path: String,
        /// Name of the skipped file
        name: String,
        /// Why it was skipped
        reason: String,
    },

    /// The analyzer failed and a placeholder text was substituted
    AnalysisFailed {
        /// Remote folder being processed
        remote_path: String,
        /// Analyzer error message
        error: String,
    },

    /// The artifact could not be written back
    UploadFailed {
        /// Remote folder being processed
        remote_path: String,
        /// Upload error message
        error: String,
    },

    /// The workspace could not be removed
    CleanupFailed {
        /// Workspace directory
        path: PathBuf,
        /// Removal error message
        error: String,
    },

    /// The run finished with a result
    Completed {
        /// Remote folder that was processed
        remote_path: String,
        /// Final status
        status: DraftStatus,
    },
}

/// Outcome class of a finished run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Analysis produced a draft
    Completed,
    /// The analyzer failed; the text is a placeholder
    AnalysisFailed,
    /// The folder held no files
    NoFilesFound,
    /// Files were listed but none could be transferred
    NothingTransferred,
}

/// Result of one pipeline run as returned to the dispatch layer
///
/// A `status` other than [`DraftStatus::Completed`] is still a successful
/// response at the transport level; callers inspect `status` to learn whether
/// analysis actually succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftResult {
    /// Remote folder that was processed
    pub remote_path: String,
    /// Final status
    pub status: DraftStatus,
    /// Draft text, or the placeholder when analysis failed
    pub result_text: Option<String>,
    /// Number of file entries listed
    pub files_listed: usize,
    /// Number of files written to the workspace
    pub files_written: usize,
    /// Remote path of the uploaded artifact, if the upload succeeded
    pub uploaded_to: Option<String>,
}

impl DraftResult {
    /// A result for a folder without files
    pub fn no_files(remote_path: impl Into<String>) -> Self {
        Self {
            remote_path: remote_path.into(),
            status: DraftStatus::NoFilesFound,
            result_text: None,
            files_listed: 0,
            files_written: 0,
            uploaded_to: None,
        }
    }
}
