//! Configuration types for portal-draft

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Main configuration for the draft pipeline
///
/// Fields are organized into logical sub-configs:
/// - [`remote`](RemoteStoreConfig): remote file store endpoints and secrets
/// - [`analyzer`](AnalyzerConfig): analysis endpoint, model, and key
/// - [`workspace`](WorkspaceConfig): where staging directories are created
/// - [`transfer`](TransferConfig): fan-out, time budget, artifact naming
/// - [`api`](ApiConfig): HTTP dispatch surface
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote file store settings
    #[serde(default)]
    pub remote: RemoteStoreConfig,

    /// Analyzer settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Local staging settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub transfer: TransferConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Remote file store configuration
///
/// The three secrets are optional at the type level so a partially configured
/// process can still start its API; the credential broker refuses to exchange
/// tokens until all three are present.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// Long-lived refresh token (`DROPBOX_REFRESH_TOKEN`)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// OAuth client id (`DROPBOX_CLIENT_ID`)
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret (`DROPBOX_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Token endpoint (default: https://api.dropboxapi.com/oauth2/token)
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// RPC endpoint base for listing (default: https://api.dropboxapi.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Content endpoint base for download/upload (default: https://content.dropboxapi.com)
    #[serde(default = "default_content_url")]
    pub content_url: String,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Deployment region reported in logs (default: eu-west-2)
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            refresh_token: None,
            client_id: None,
            client_secret: None,
            token_url: default_token_url(),
            api_url: default_api_url(),
            content_url: default_content_url(),
            request_timeout: default_request_timeout(),
            region: default_region(),
        }
    }
}

/// Analyzer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// API key for the analysis endpoint (`OPENAI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (default: https://api.openai.com/v1)
    #[serde(default = "default_analyzer_base_url")]
    pub base_url: String,

    /// Model name (default: gpt-5)
    #[serde(default = "default_model")]
    pub model: String,

    /// Instruction sent ahead of the images
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Upper bound on generated tokens (default: 1000)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout (default: 240 seconds)
    #[serde(default = "default_analyzer_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_analyzer_base_url(),
            model: default_model(),
            prompt: default_prompt(),
            max_tokens: default_max_tokens(),
            request_timeout: default_analyzer_timeout(),
        }
    }
}

/// Local staging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory under which per-run workspaces are created
    /// (default: `<system temp>/portal-draft`)
    #[serde(default = "default_workspace_root")]
    pub root_dir: PathBuf,

    /// Name prefix of each workspace directory (default: "draft")
    #[serde(default = "default_workspace_prefix")]
    pub prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root_dir: default_workspace_root(),
            prefix: default_workspace_prefix(),
        }
    }
}

/// Pipeline behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum files downloaded at once (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Upper bound on a whole pipeline run (default: 300 seconds)
    ///
    /// Batches routinely take minutes, so this must stay well above the
    /// seconds-level defaults of typical HTTP hosts.
    #[serde(default = "default_pipeline_timeout", with = "duration_serde")]
    pub pipeline_timeout: Duration,

    /// Folder created beside the source files for the result (default: "Portal Draft")
    #[serde(default = "default_result_subfolder")]
    pub result_subfolder: String,

    /// Local and remote file name of the artifact (default: "portal-draft.txt")
    #[serde(default = "default_artifact_file_name")]
    pub artifact_file_name: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            pipeline_timeout: default_pipeline_timeout(),
            result_subfolder: default_result_subfolder(),
            artifact_file_name: default_artifact_file_name(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// How long an issued request token stays usable (default: 7 days)
    #[serde(default = "default_token_validity", with = "duration_serde")]
    pub token_validity: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            token_validity: default_token_validity(),
        }
    }
}

impl Config {
    /// Build a configuration from process environment variables
    ///
    /// Unset variables fall back to defaults. Secrets are read but not
    /// required here; call [`Config::validate`] to enforce them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a numeric or address variable is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        config.remote.refresh_token = env_var("DROPBOX_REFRESH_TOKEN");
        config.remote.client_id = env_var("DROPBOX_CLIENT_ID");
        config.remote.client_secret = env_var("DROPBOX_CLIENT_SECRET");
        if let Some(url) = env_var("DROPBOX_TOKEN_URL") {
            config.remote.token_url = url;
        }
        if let Some(url) = env_var("DROPBOX_API_URL") {
            config.remote.api_url = url;
        }
        if let Some(url) = env_var("DROPBOX_CONTENT_URL") {
            config.remote.content_url = url;
        }
        if let Some(region) = env_var("AWS_DEFAULT_REGION") {
            config.remote.region = region;
        }

        config.analyzer.api_key = env_var("OPENAI_API_KEY");
        if let Some(url) = env_var("OPENAI_BASE_URL") {
            config.analyzer.base_url = url;
        }
        if let Some(model) = env_var("OPENAI_MODEL") {
            config.analyzer.model = model;
        }

        if let Some(dir) = env_var("PORTAL_DRAFT_WORKSPACE_DIR") {
            config.workspace.root_dir = PathBuf::from(dir);
        }
        if let Some(n) = parse_env::<usize>("PORTAL_DRAFT_MAX_CONCURRENT_DOWNLOADS")? {
            config.transfer.max_concurrent_downloads = n;
        }
        if let Some(secs) = parse_env::<u64>("PORTAL_DRAFT_PIPELINE_TIMEOUT_SECS")? {
            config.transfer.pipeline_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("PORTAL_DRAFT_TOKEN_VALIDITY_SECS")? {
            config.api.token_validity = Duration::from_secs(secs);
        }

        if let Some(addr) = parse_env::<SocketAddr>("PORTAL_DRAFT_BIND_ADDRESS")? {
            config.api.bind_address = addr;
        } else if let Some(port) = parse_env::<u16>("PORT")? {
            config.api.bind_address = SocketAddr::from(([0, 0, 0, 0], port));
        }

        Ok(config)
    }

    /// Check that every required secret is present and settings are usable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing or invalid key.
    pub fn validate(&self) -> Result<()> {
        let secrets = [
            ("DROPBOX_REFRESH_TOKEN", &self.remote.refresh_token),
            ("DROPBOX_CLIENT_ID", &self.remote.client_id),
            ("DROPBOX_CLIENT_SECRET", &self.remote.client_secret),
            ("OPENAI_API_KEY", &self.analyzer.api_key),
        ];
        for (key, value) in secrets {
            if value.as_deref().is_none_or(str::is_empty) {
                return Err(Error::config(format!("{key} is not set"), key));
            }
        }

        for (key, url) in [
            ("DROPBOX_TOKEN_URL", &self.remote.token_url),
            ("DROPBOX_API_URL", &self.remote.api_url),
            ("DROPBOX_CONTENT_URL", &self.remote.content_url),
            ("OPENAI_BASE_URL", &self.analyzer.base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| Error::config(format!("{key} is not a valid URL: {e}"), key))?;
        }

        if self.transfer.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "max_concurrent_downloads must be at least 1",
                "PORTAL_DRAFT_MAX_CONCURRENT_DOWNLOADS",
            ));
        }

        for (key, duration) in [
            ("PORTAL_DRAFT_PIPELINE_TIMEOUT_SECS", self.transfer.pipeline_timeout),
            ("PORTAL_DRAFT_TOKEN_VALIDITY_SECS", self.api.token_validity),
        ] {
            if duration.is_zero() {
                return Err(Error::config(format!("{key} must be at least 1 second"), key));
            }
        }

        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::config(format!("{key}={raw} is invalid: {e}"), key)),
        None => Ok(None),
    }
}

// Default value functions
fn default_token_url() -> String {
    "https://api.dropboxapi.com/oauth2/token".into()
}

fn default_api_url() -> String {
    "https://api.dropboxapi.com".into()
}

fn default_content_url() -> String {
    "https://content.dropboxapi.com".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_region() -> String {
    "eu-west-2".into()
}

fn default_analyzer_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-5".into()
}

fn default_prompt() -> String {
    "Analyze these property images and write a detailed, engaging property description \
     for a real estate portal. Cover the key features, describe each room, and highlight \
     the selling points most likely to attract buyers."
        .into()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_analyzer_timeout() -> Duration {
    Duration::from_secs(240)
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("portal-draft")
}

fn default_workspace_prefix() -> String {
    "draft".into()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_pipeline_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_result_subfolder() -> String {
    "Portal Draft".into()
}

fn default_artifact_file_name() -> String {
    "portal-draft.txt".into()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_token_validity() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60) // 1 week
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
