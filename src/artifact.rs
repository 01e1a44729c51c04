//! The draft text as written to disk and uploaded

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Fixed header placed above every draft
pub const DISCLAIMER: &str = "\
DISCLAIMER: This listing draft was generated automatically from the property \
images. Check every detail (room sizes, features, condition) against the \
property itself before publishing it.
------------------------------------------------------------------------

";

/// Draft text plus the disclaimer header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisArtifact {
    text: String,
}

impl AnalysisArtifact {
    /// Wrap analyzer output (or a placeholder) as an artifact
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The draft text without the header
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Full file contents: header followed by the text
    pub fn contents(&self) -> String {
        format!("{DISCLAIMER}{}\n", self.text.trim_end())
    }

    /// Write the artifact as UTF-8 to `dir/file_name`, replacing any existing file
    pub async fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        tokio::fs::write(&path, self.contents()).await?;
        tracing::debug!(path = ?path, "artifact written");
        Ok(path)
    }
}
