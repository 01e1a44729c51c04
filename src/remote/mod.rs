//! Remote file store capability
//!
//! The pipeline talks to the store only through [`RemoteStore`] and
//! [`TokenExchanger`]; [`DropboxClient`] implements both over HTTP. Every
//! operation reports a rejected credential as [`RemoteError::Unauthorized`]
//! so the caller can refresh and retry.

use crate::credentials::{ClientSecrets, Credential};
use crate::error::RemoteError;
use crate::types::RemoteFile;
use async_trait::async_trait;

mod dropbox;

pub use dropbox::DropboxClient;

/// Exchanges the long-lived refresh token for a short-lived access token
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform one token exchange and return the new access token
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the endpoint is unreachable or answers
    /// with a non-success status.
    async fn exchange_refresh_token(&self, secrets: &ClientSecrets)
    -> Result<String, RemoteError>;
}

/// Folder listing and file transfer against the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every entry directly under `path`, files and folders alike
    async fn list_folder(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Fetch the full content of one file
    async fn download_file(
        &self,
        remote_path: &str,
        credential: &Credential,
    ) -> Result<Vec<u8>, RemoteError>;

    /// Write `bytes` to `dest_path`, replacing any file already there
    async fn upload_file(
        &self,
        dest_path: &str,
        bytes: &[u8],
        credential: &Credential,
    ) -> Result<(), RemoteError>;
}
