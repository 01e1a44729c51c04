//! Bearer credential caching and refresh for the remote file store
//!
//! The broker owns a single credential slot guarded by an async mutex. There
//! is no expiry timer: callers learn a credential went stale when the store
//! rejects it, and then ask the broker for a replacement.

use crate::config::RemoteStoreConfig;
use crate::error::{Error, Result};
use crate::remote::TokenExchanger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A bearer token for the remote file store
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    obtained_at: DateTime<Utc>,
    generation: u64,
}

impl Credential {
    /// The raw access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// When the token was obtained
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// Sequence number of the exchange that produced this token (starts at 1)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Build a credential outside the broker, for store implementations and tests
    pub fn new(access_token: impl Into<String>, generation: u64) -> Self {
        Self {
            access_token: access_token.into(),
            obtained_at: Utc::now(),
            generation,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .field("generation", &self.generation)
            .finish()
    }
}

/// The three secrets needed to exchange a refresh token
#[derive(Clone)]
pub struct ClientSecrets {
    /// Long-lived refresh token
    pub refresh_token: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl ClientSecrets {
    /// Collect the secrets from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialUnavailable`] naming every missing secret.
    pub fn from_config(config: &RemoteStoreConfig) -> Result<Self> {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        match (
            present(&config.refresh_token),
            present(&config.client_id),
            present(&config.client_secret),
        ) {
            (Some(refresh_token), Some(client_id), Some(client_secret)) => Ok(Self {
                refresh_token,
                client_id,
                client_secret,
            }),
            (refresh_token, client_id, client_secret) => {
                let missing: Vec<&str> = [
                    ("DROPBOX_REFRESH_TOKEN", refresh_token.is_none()),
                    ("DROPBOX_CLIENT_ID", client_id.is_none()),
                    ("DROPBOX_CLIENT_SECRET", client_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, missing)| missing.then_some(key))
                .collect();
                Err(Error::CredentialUnavailable(format!(
                    "missing required configuration: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    current: Option<Credential>,
    issued: u64,
}

/// Obtains, caches, and refreshes the remote store credential
///
/// One broker is built at startup and shared (behind `Arc`) by every
/// pipeline run. Refreshes are serialized: a task that needs a refresh while
/// another one is in flight waits for it instead of issuing a duplicate.
pub struct CredentialBroker {
    exchanger: Arc<dyn TokenExchanger>,
    secrets: Option<ClientSecrets>,
    missing_reason: Option<String>,
    slot: Mutex<Slot>,
    exchanges: AtomicU64,
}

impl CredentialBroker {
    /// Create a broker; missing secrets surface on first use
    pub fn new(exchanger: Arc<dyn TokenExchanger>, config: &RemoteStoreConfig) -> Self {
        let (secrets, missing_reason) = match ClientSecrets::from_config(config) {
            Ok(secrets) => (Some(secrets), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            exchanger,
            secrets,
            missing_reason,
            slot: Mutex::new(Slot::default()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return the cached credential, fetching one if none is cached
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialUnavailable`] if the exchange fails; nothing
    /// is cached in that case.
    pub async fn ensure_valid(&self) -> Result<Credential> {
        let mut slot = self.slot.lock().await;
        if let Some(credential) = &slot.current {
            return Ok(credential.clone());
        }
        debug!("no cached credential, exchanging refresh token");
        self.exchange_into(&mut slot).await
    }

    /// Unconditionally exchange a new token and replace the cached one
    ///
    /// On failure the previous credential stays cached.
    pub async fn force_refresh(&self) -> Result<Credential> {
        let mut slot = self.slot.lock().await;
        self.exchange_into(&mut slot).await
    }

    /// Replace a credential the remote store just rejected
    ///
    /// If another task already replaced `rejected` while this one waited for
    /// the lock, the newer credential is returned without a second exchange.
    /// If the exchange fails the rejected credential is dropped from the
    /// cache so it is never handed out again.
    pub async fn refresh_after_rejection(&self, rejected: &Credential) -> Result<Credential> {
        let mut slot = self.slot.lock().await;
        if let Some(current) = &slot.current
            && current.generation != rejected.generation
        {
            debug!(
                rejected = rejected.generation,
                current = current.generation,
                "credential already refreshed by another task"
            );
            return Ok(current.clone());
        }

        let result = self.exchange_into(&mut slot).await;
        if result.is_err() {
            slot.current = None;
        }
        result
    }

    /// Number of token exchanges attempted so far
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    async fn exchange_into(&self, slot: &mut Slot) -> Result<Credential> {
        let Some(secrets) = &self.secrets else {
            let reason = self
                .missing_reason
                .clone()
                .unwrap_or_else(|| "client secrets not configured".into());
            warn!(reason = %reason, "cannot exchange refresh token");
            return Err(Error::CredentialUnavailable(reason));
        };

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let access_token = self
            .exchanger
            .exchange_refresh_token(secrets)
            .await
            .map_err(|e| {
                warn!(error = %e, "token exchange failed");
                Error::CredentialUnavailable(format!("token exchange failed: {e}"))
            })?;

        slot.issued += 1;
        let credential = Credential {
            access_token,
            obtained_at: Utc::now(),
            generation: slot.issued,
        };
        slot.current = Some(credential.clone());

        info!(generation = credential.generation, "access token refreshed");
        Ok(credential)
    }
}
