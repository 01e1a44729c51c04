//! Remote folder listing filtered to file entries

use crate::credentials::CredentialBroker;
use crate::error::{Error, Result};
use crate::remote::RemoteStore;
use crate::retry::with_credential_refresh;
use crate::types::RemoteFile;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lists the file entries directly under a remote folder
pub struct RemoteDirectoryLister {
    store: Arc<dyn RemoteStore>,
    broker: Arc<CredentialBroker>,
}

impl RemoteDirectoryLister {
    /// Create a lister over `store`, authenticated by `broker`
    pub fn new(store: Arc<dyn RemoteStore>, broker: Arc<CredentialBroker>) -> Self {
        Self { store, broker }
    }

    /// List `remote_path`, dropping folder entries
    ///
    /// A rejected credential is refreshed once and the listing retried once.
    /// An empty folder yields an empty `Vec`, not an error.
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialUnavailable`] if no credential can be obtained
    /// - [`Error::RemoteFolderListingFailed`] for any other listing failure
    pub async fn list(&self, remote_path: &str) -> Result<Vec<RemoteFile>> {
        let entries = with_credential_refresh(&self.broker, |credential| async move {
            self.store.list_folder(remote_path, &credential).await
        })
        .await
        .map_err(|e| match e {
            Error::CredentialUnavailable(_) => e,
            other => {
                warn!(remote_path = %remote_path, error = %other, "folder listing failed");
                Error::RemoteFolderListingFailed {
                    path: remote_path.to_string(),
                    reason: other.to_string(),
                }
            }
        })?;

        let total = entries.len();
        let files: Vec<RemoteFile> = entries.into_iter().filter(RemoteFile::is_file).collect();

        debug!(
            remote_path = %remote_path,
            entries = total,
            files = files.len(),
            "folder listed"
        );

        Ok(files)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::test_helpers::{FakeExchanger, FakeStore, complete_remote_config};

    fn lister(store: Arc<FakeStore>) -> (RemoteDirectoryLister, Arc<FakeExchanger>) {
        let exchanger = Arc::new(FakeExchanger::new());
        let broker = Arc::new(CredentialBroker::new(
            exchanger.clone(),
            &complete_remote_config(),
        ));
        (RemoteDirectoryLister::new(store, broker), exchanger)
    }

    #[tokio::test]
    async fn test_folders_are_dropped() {
        let store = Arc::new(FakeStore::new());
        let mut entries = store.photo_folder("/P/Edited/X", 5);
        entries.insert(2, RemoteFile::folder("Raw", "/P/Edited/X/Raw"));
        store.folder("/P/Edited/X", entries);

        let (lister, _) = lister(store);
        let files = lister.list("/P/Edited/X").await.unwrap();

        assert_eq!(files.len(), 5);
        assert!(files.iter().all(RemoteFile::is_file));
        assert_eq!(files[0].name, "photo-1.jpg");
    }

    #[tokio::test]
    async fn test_empty_folder_is_empty_vec() {
        let store = Arc::new(FakeStore::new());
        store.folder("/P/Empty", vec![RemoteFile::folder("Sub", "/P/Empty/Sub")]);

        let (lister, _) = lister(store);
        assert!(lister.list("/P/Empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_rejection_is_retried() {
        let store = Arc::new(FakeStore::new());
        store.photo_folder("/P/X", 2);
        store.reject("/P/X", 1);

        let (lister, exchanger) = lister(store.clone());
        let files = lister.list("/P/X").await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(store.list_calls(), 2);
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn test_double_rejection_fails_listing() {
        let store = Arc::new(FakeStore::new());
        store.photo_folder("/P/X", 2);
        store.reject("/P/X", 2);

        let (lister, _) = lister(store.clone());
        let result = lister.list("/P/X").await;

        match result {
            Err(Error::RemoteFolderListingFailed { path, .. }) => assert_eq!(path, "/P/X"),
            other => panic!("expected RemoteFolderListingFailed, got {other:?}"),
        }
        assert_eq!(store.list_calls(), 2, "retried at most once");
    }

    #[tokio::test]
    async fn test_other_failure_is_listing_failure() {
        let store = Arc::new(FakeStore::new());
        store.fail(
            "/P/X",
            RemoteError::Status {
                status: 500,
                body: "internal".into(),
            },
        );

        let (lister, _) = lister(store.clone());
        assert!(matches!(
            lister.list("/P/X").await,
            Err(Error::RemoteFolderListingFailed { .. })
        ));
        assert_eq!(store.list_calls(), 1);
    }
}
