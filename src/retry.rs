//! Refresh-once retry for remote calls rejected with 401
//!
//! Every call against the remote store goes through [`with_credential_refresh`]:
//! the call runs with the broker's current credential, and if the store
//! rejects it the broker refreshes it and the call runs exactly once more. A
//! second rejection is returned to the caller, never retried again.
//!
//! # Example
//!
//! ```no_run
//! use portal_draft::retry::with_credential_refresh;
//! use portal_draft::{CredentialBroker, RemoteStore};
//!
//! # async fn example(broker: &CredentialBroker, store: &dyn RemoteStore) -> portal_draft::Result<()> {
//! let entries = with_credential_refresh(broker, |credential| async move {
//!     store.list_folder("/P/Edited", &credential).await
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::credentials::{Credential, CredentialBroker};
use crate::error::{Error, RemoteError, Result};
use std::future::Future;

/// Run `operation` with a valid credential, refreshing and retrying once on 401
///
/// # Errors
///
/// - [`Error::CredentialUnavailable`] if no credential can be obtained
/// - [`Error::Remote`] with the last failure otherwise (including a second
///   [`RemoteError::Unauthorized`])
pub async fn with_credential_refresh<F, Fut, T>(
    broker: &CredentialBroker,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = std::result::Result<T, RemoteError>>,
{
    let credential = broker.ensure_valid().await?;

    match operation(credential.clone()).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_unauthorized() => {
            tracing::warn!(
                generation = credential.generation(),
                "credential rejected, refreshing and retrying once"
            );
            let refreshed = broker.refresh_after_rejection(&credential).await?;
            match operation(refreshed).await {
                Ok(value) => {
                    tracing::info!("call succeeded after credential refresh");
                    Ok(value)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "call failed again after credential refresh");
                    Err(Error::Remote(e))
                }
            }
        }
        Err(e) => Err(Error::Remote(e)),
    }
}
