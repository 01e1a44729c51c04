//! Ephemeral local staging directories
//!
//! Each pipeline run stages its files in its own [`Workspace`], a uniquely
//! named directory under the configured root. The run that acquired the
//! workspace is its only user. [`Workspace::release`] removes the directory
//! and may be called any number of times; a workspace dropped without being
//! released (timeout, cancellation, panic) removes its directory in `Drop`.

use crate::config::WorkspaceConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Creates workspaces under one root directory
#[derive(Clone, Debug)]
pub struct WorkspaceFactory {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceFactory {
    /// Create a factory from configuration; nothing is touched on disk yet
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            root: config.root_dir.clone(),
            prefix: config.prefix.clone(),
        }
    }

    /// Directory under which workspaces are created
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new, empty workspace directory
    ///
    /// The name combines a timestamp and a random UUID so concurrent runs
    /// never share a directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the root or the workspace directory cannot be
    /// created.
    pub async fn acquire(&self) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.root).await?;

        let created_at = Utc::now();
        let name = format!(
            "{}-{}-{}",
            self.prefix,
            created_at.format("%Y%m%dT%H%M%S"),
            Uuid::new_v4()
        );
        let root_dir = self.root.join(name);

        // create_dir, not create_dir_all: an existing directory means a collision
        tokio::fs::create_dir(&root_dir).await?;

        tracing::debug!(path = ?root_dir, "workspace created");

        Ok(Workspace {
            root_dir,
            created_at,
            released: AtomicBool::new(false),
        })
    }
}

/// A per-run staging directory
#[derive(Debug)]
pub struct Workspace {
    root_dir: PathBuf,
    created_at: DateTime<Utc>,
    released: AtomicBool,
}

impl Workspace {
    /// The directory files are staged in
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// When the workspace was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true once [`release`](Self::release) has succeeded
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Remove the directory and everything in it
    ///
    /// Calling this again after a successful release does nothing. A
    /// directory that is already gone counts as released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cleanup`] if removal fails; the workspace then stays
    /// unreleased so a later call (or `Drop`) can try again.
    pub async fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match tokio::fs::remove_dir_all(&self.root_dir).await {
            Ok(()) => {
                tracing::debug!(path = ?self.root_dir, "workspace released");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                self.released.store(false, Ordering::SeqCst);
                Err(Error::Cleanup {
                    path: self.root_dir.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        match std::fs::remove_dir_all(&self.root_dir) {
            Ok(()) => {
                tracing::warn!(path = ?self.root_dir, "workspace removed on drop without release");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = ?self.root_dir,
                    error = %e,
                    "failed to remove workspace on drop"
                );
            }
        }
    }
}
