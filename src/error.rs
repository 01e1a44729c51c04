//! Error types for portal-draft
//!
//! This module provides the crate-wide error type, including:
//! - Run-aborting failures (credential, listing, empty folder)
//! - Absorbed failures that are logged and folded into a degraded result
//!   (analysis, upload, cleanup)
//! - Transport failures from the remote file store and the analyzer
//! - HTTP status code mapping for the dispatch surface

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for portal-draft operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for portal-draft
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "DROPBOX_CLIENT_ID")
        key: Option<String>,
    },

    /// No credential could be obtained for the remote file store
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// Listing a remote folder failed, including after one credential refresh
    #[error("failed to list remote folder {path}: {reason}")]
    RemoteFolderListingFailed {
        /// The remote folder that was listed
        path: String,
        /// Why the listing failed
        reason: String,
    },

    /// The remote folder holds no file entries
    #[error("no files found in remote folder {path}")]
    NoFilesFound {
        /// The remote folder that was listed
        path: String,
    },

    /// A request token is unknown, expired, or already used
    #[error("no usable folder path for token {0}")]
    FolderPathNotFound(String),

    /// The analyzer failed to describe the staged files
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Writing the result artifact back to the remote store failed
    #[error("upload to {destination} failed: {reason}")]
    Upload {
        /// Remote destination path of the artifact
        destination: String,
        /// Why the upload failed
        reason: String,
    },

    /// Removing a workspace directory failed (non-fatal, logged as warning)
    #[error("cleanup failed for {path}: {reason}")]
    Cleanup {
        /// The workspace directory that could not be removed
        path: PathBuf,
        /// Why removal failed
        reason: String,
    },

    /// The workspace was released or its directory disappeared
    #[error("workspace unavailable: {path}")]
    WorkspaceUnavailable {
        /// The workspace directory
        path: PathBuf,
    },

    /// A remote file store or analyzer call failed
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A pipeline run exceeded its time budget
    #[error("pipeline timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error naming the offending key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure of a single call against the remote file store or the analyzer
///
/// Authorization failures are kept distinct from every other failure so
/// callers can decide whether a credential refresh is worth attempting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The credential was rejected (HTTP 401)
    #[error("authorization rejected")]
    Unauthorized,

    /// The remote answered with a non-success status other than 401
    #[error("remote returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// The request never produced a response (connect, timeout, TLS, ...)
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Returns true if this failure means the credential is no longer valid
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized)
    }

    /// Classify a non-success HTTP status, reading the body for context
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        if status == 401 {
            return RemoteError::Unauthorized;
        }
        let body = response.text().await.unwrap_or_default();
        RemoteError::Status { status, body }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().map(|s| s.as_u16()) == Some(401) {
            RemoteError::Unauthorized
        } else if e.is_decode() {
            RemoteError::Malformed(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "folder_path_not_found",
///     "message": "no usable folder path for token abc",
///     "details": { "token": "abc" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "credential_unavailable")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 404 Not Found
            Error::NoFilesFound { .. } => 404,
            Error::FolderPathNotFound(_) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Cleanup { .. } => 500,
            Error::WorkspaceUnavailable { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::RemoteFolderListingFailed { .. } => 502,
            Error::Analysis(_) => 502,
            Error::Upload { .. } => 502,
            Error::Remote(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::CredentialUnavailable(_) => 503,

            // 504 Gateway Timeout
            Error::Timeout(_) => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::CredentialUnavailable(_) => "credential_unavailable",
            Error::RemoteFolderListingFailed { .. } => "remote_folder_listing_failed",
            Error::NoFilesFound { .. } => "no_files_found",
            Error::FolderPathNotFound(_) => "folder_path_not_found",
            Error::Analysis(_) => "analysis_failed",
            Error::Upload { .. } => "upload_failed",
            Error::Cleanup { .. } => "cleanup_failed",
            Error::WorkspaceUnavailable { .. } => "workspace_unavailable",
            Error::Remote(RemoteError::Unauthorized) => "unauthorized",
            Error::Remote(_) => "remote_error",
            Error::Timeout(_) => "timeout",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::RemoteFolderListingFailed { path, .. } | Error::NoFilesFound { path } => {
                Some(serde_json::json!({
                    "path": path,
                }))
            }
            Error::FolderPathNotFound(token) => Some(serde_json::json!({
                "token": token,
            })),
            Error::Upload { destination, .. } => Some(serde_json::json!({
                "destination": destination,
            })),
            Error::Timeout(limit) => Some(serde_json::json!({
                "timeout_secs": limit.as_secs(),
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
