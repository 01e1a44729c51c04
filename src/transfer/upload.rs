//! Writing the result artifact back beside the source files

use crate::credentials::CredentialBroker;
use crate::error::{Error, Result};
use crate::remote::RemoteStore;
use crate::retry::with_credential_refresh;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Uploads a local artifact into a fixed subfolder of a remote folder
pub struct ResultUploader {
    store: Arc<dyn RemoteStore>,
    broker: Arc<CredentialBroker>,
    result_subfolder: String,
}

impl ResultUploader {
    /// Create an uploader writing into `result_subfolder` (e.g. "Portal Draft")
    pub fn new(
        store: Arc<dyn RemoteStore>,
        broker: Arc<CredentialBroker>,
        result_subfolder: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            result_subfolder: result_subfolder.into(),
        }
    }

    /// Remote path an artifact named `file_name` lands at for `folder`
    pub fn destination_for(&self, folder: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            folder.trim_end_matches('/'),
            self.result_subfolder,
            file_name
        )
    }

    /// Upload `local_file` under `remote_folder`, replacing any earlier version
    ///
    /// Returns the remote path written. The local file is left untouched
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upload`] if the file cannot be read, no credential is
    /// available, or the store refuses the write.
    pub async fn upload(&self, local_file: &Path, remote_folder: &str) -> Result<String> {
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Upload {
                destination: remote_folder.to_string(),
                reason: format!("{} has no usable file name", local_file.display()),
            })?;
        let destination = self.destination_for(remote_folder, file_name);

        let upload_error = |reason: String| {
            warn!(destination = %destination, reason = %reason, "upload failed");
            Error::Upload {
                destination: destination.clone(),
                reason,
            }
        };

        self.broker
            .force_refresh()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let bytes = tokio::fs::read(local_file)
            .await
            .map_err(|e| upload_error(format!("reading {}: {e}", local_file.display())))?;

        let dest = destination.as_str();
        let body = bytes.as_slice();
        with_credential_refresh(&self.broker, |credential| async move {
            self.store.upload_file(dest, body, &credential).await
        })
        .await
        .map_err(|e| upload_error(e.to_string()))?;

        info!(destination = %destination, bytes = bytes.len(), "artifact uploaded");
        Ok(destination)
    }
}
