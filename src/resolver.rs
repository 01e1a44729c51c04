//! Request tokens handed to customers in place of remote folder paths
//!
//! A token is the first four characters of the folder path followed by the
//! UTC issue time as `YYYYMMDDHHMMSS`. Each token is usable until it expires
//! or until a draft has been produced with it, whichever comes first.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// A request token and the folder it stands for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Opaque value given to the customer
    pub token: String,
    /// Remote folder the token resolves to
    pub remote_path: String,
    /// Set once a draft has been produced with this token
    pub used: bool,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
    /// First instant at which the token no longer resolves
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Whether the token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issues request tokens and maps them back onto remote folders
#[async_trait]
pub trait FolderPathResolver: Send + Sync {
    /// Issue a new token for `remote_path`
    async fn issue(&self, remote_path: &str) -> Result<IssuedToken>;

    /// Look up the folder registered for `token`
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderPathNotFound`] if the token was never issued,
    /// has expired, or has already been used.
    async fn resolve(&self, token: &str) -> Result<String>;

    /// Record that a draft was produced with `token`
    async fn mark_used(&self, token: &str) -> Result<()>;
}

/// Resolver backed by a process-local map
///
/// Tokens do not survive a restart.
#[derive(Debug)]
pub struct InMemoryPathResolver {
    validity: Duration,
    tokens: RwLock<HashMap<String, IssuedToken>>,
}

impl InMemoryPathResolver {
    /// Create an empty resolver whose tokens live for `validity`
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn issue_at(
        &self,
        remote_path: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let expires_at = TimeDelta::from_std(self.validity)
            .ok()
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| {
                Error::config(
                    "token validity is out of range",
                    "PORTAL_DRAFT_TOKEN_VALIDITY_SECS",
                )
            })?;

        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, issued| !issued.is_expired_at(now));

        let base = token_for(remote_path, now);
        let mut token = base.clone();
        let mut suffix = 1;
        while tokens.contains_key(&token) {
            suffix += 1;
            token = format!("{base}-{suffix}");
        }

        let issued = IssuedToken {
            token: token.clone(),
            remote_path: remote_path.to_string(),
            used: false,
            created_at: now,
            expires_at,
        };
        tokens.insert(token, issued.clone());

        tracing::info!(
            token = %issued.token,
            expires_at = %issued.expires_at,
            "issued request token"
        );
        Ok(issued)
    }

    pub(crate) async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<String> {
        let tokens = self.tokens.read().await;
        match tokens.get(token) {
            Some(issued) if issued.used => {
                tracing::debug!(token, "request token already used");
            }
            Some(issued) if issued.is_expired_at(now) => {
                tracing::debug!(token, expires_at = %issued.expires_at, "request token expired");
            }
            Some(issued) => return Ok(issued.remote_path.clone()),
            None => {}
        }
        Err(Error::FolderPathNotFound(token.to_string()))
    }
}

/// First four characters of the path followed by `YYYYMMDDHHMMSS`
fn token_for(remote_path: &str, now: DateTime<Utc>) -> String {
    let prefix: String = remote_path.chars().take(4).collect();
    format!("{prefix}{}", now.format("%Y%m%d%H%M%S"))
}

#[async_trait]
impl FolderPathResolver for InMemoryPathResolver {
    async fn issue(&self, remote_path: &str) -> Result<IssuedToken> {
        self.issue_at(remote_path, Utc::now()).await
    }

    async fn resolve(&self, token: &str) -> Result<String> {
        self.resolve_at(token, Utc::now()).await
    }

    async fn mark_used(&self, token: &str) -> Result<()> {
        match self.tokens.write().await.get_mut(token) {
            Some(issued) => {
                issued.used = true;
                Ok(())
            }
            None => Err(Error::FolderPathNotFound(token.to_string())),
        }
    }
}
