//! Analyzer capability and its OpenAI-compatible implementation
//!
//! The pipeline only needs "paths in, text out". [`OpenAiAnalyzer`] sends
//! every staged image as a base64 data URL, after a fixed instruction, to a
//! chat-completions endpoint and returns the first choice's text.

use crate::config::AnalyzerConfig;
use crate::error::{Error, RemoteError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text returned when the endpoint answers without any content
pub const EMPTY_RESPONSE_TEXT: &str = "Unable to generate description";

/// Turns a set of staged files into draft text
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Describe the files at `paths`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Analysis`] if the files cannot be read or the analysis
    /// service fails.
    async fn analyze(&self, paths: &[PathBuf]) -> Result<String>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Chat-completions client with vision input
pub struct OpenAiAnalyzer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    prompt: String,
    max_tokens: u32,
}

impl OpenAiAnalyzer {
    /// Build an analyzer from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no API key is configured, or
    /// [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("OPENAI_API_KEY is not set", "OPENAI_API_KEY"))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn image_part(path: &Path) -> Result<serde_json::Value> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Analysis(format!("reading {}: {e}", path.display())))?;
        let url = format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes));
        Ok(json!({
            "type": "image_url",
            "image_url": { "url": url },
        }))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn analyze(&self, paths: &[PathBuf]) -> Result<String> {
        if paths.is_empty() {
            return Err(Error::Analysis("no images to analyze".into()));
        }

        let mut content = vec![json!({ "type": "text", "text": self.prompt })];
        for path in paths {
            content.push(Self::image_part(path).await?);
        }

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_completion_tokens": self.max_tokens,
        });

        debug!(model = %self.model, images = paths.len(), "requesting analysis");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Analysis(RemoteError::from(e).to_string()))?;

        if !response.status().is_success() {
            let failure = RemoteError::from_response(response).await;
            return Err(Error::Analysis(failure.to_string()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("malformed response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string());

        info!(model = %self.model, chars = text.len(), "analysis finished");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}
