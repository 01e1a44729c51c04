//! Listing, downloading, and uploading against the remote store
//!
//! - [`RemoteDirectoryLister`] lists the file entries of a folder
//! - [`FileDownloader`] stages a batch of files in a [`Workspace`](crate::Workspace)
//! - [`TransferPipeline`] combines the two into a [`TransferManifest`]
//! - [`ResultUploader`] writes an artifact back beside the source files
//!
//! Every remote call goes through
//! [`with_credential_refresh`](crate::retry::with_credential_refresh).

mod download;
mod lister;
mod pipeline;
mod upload;

pub use download::{DownloadReport, FileDownloader, FileOutcome, FileTransfer, SkipReason};
pub use lister::RemoteDirectoryLister;
pub use pipeline::{TransferManifest, TransferPipeline};
pub use upload::ResultUploader;
