//! Dropbox v2 HTTP implementation of the remote store capability

use super::{RemoteStore, TokenExchanger};
use crate::config::RemoteStoreConfig;
use crate::credentials::{ClientSecrets, Credential};
use crate::error::{Error, RemoteError, Result};
use crate::types::{EntryKind, RemoteFile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// HTTP client for the Dropbox token, RPC, and content endpoints
#[derive(Clone, Debug)]
pub struct DropboxClient {
    http: reqwest::Client,
    token_url: String,
    api_url: String,
    content_url: String,
}

impl DropboxClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the HTTP client cannot be constructed.
    pub fn new(config: &RemoteStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
        })
    }

    async fn list_page(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        credential: &Credential,
    ) -> std::result::Result<ListFolderPage, RemoteError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_url, endpoint))
            .bearer_auth(credential.access_token())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::from_response(response).await);
        }

        response
            .json::<ListFolderPage>()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ListFolderPage {
    entries: Vec<RawEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    path_display: Option<String>,
}

impl RawEntry {
    fn into_remote_file(self) -> Option<RemoteFile> {
        let kind = match self.tag.as_str() {
            "file" => EntryKind::File,
            "folder" => EntryKind::Folder,
            // "deleted" and anything newer the API may add
            _ => return None,
        };
        Some(RemoteFile {
            name: self.name,
            remote_path: self.path_lower.or(self.path_display),
            kind,
        })
    }
}

#[derive(Serialize)]
struct DownloadArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

/// Serialize a `Dropbox-API-Arg` value; header values must be ASCII, so
/// everything else is written as `\uXXXX` escapes.
fn header_safe_json<T: Serialize>(value: &T) -> std::result::Result<String, RemoteError> {
    let json = serde_json::to_string(value).map_err(|e| RemoteError::Malformed(e.to_string()))?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

/// The API addresses the root folder as the empty string
fn api_path(path: &str) -> &str {
    if path == "/" { "" } else { path }
}

#[async_trait]
impl TokenExchanger for DropboxClient {
    async fn exchange_refresh_token(
        &self,
        secrets: &ClientSecrets,
    ) -> std::result::Result<String, RemoteError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", secrets.refresh_token.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::from_response(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl RemoteStore for DropboxClient {
    async fn list_folder(
        &self,
        path: &str,
        credential: &Credential,
    ) -> std::result::Result<Vec<RemoteFile>, RemoteError> {
        let mut page = self
            .list_page(
                "/2/files/list_folder",
                &serde_json::json!({ "path": api_path(path), "recursive": false }),
                credential,
            )
            .await?;

        let mut entries: Vec<RemoteFile> = Vec::with_capacity(page.entries.len());
        loop {
            entries.extend(page.entries.into_iter().filter_map(RawEntry::into_remote_file));
            if !page.has_more {
                break;
            }
            debug!(path = %path, listed = entries.len(), "folder listing continues");
            page = self
                .list_page(
                    "/2/files/list_folder/continue",
                    &serde_json::json!({ "cursor": page.cursor }),
                    credential,
                )
                .await?;
        }

        Ok(entries)
    }

    async fn download_file(
        &self,
        remote_path: &str,
        credential: &Credential,
    ) -> std::result::Result<Vec<u8>, RemoteError> {
        let arg = header_safe_json(&DownloadArg { path: remote_path })?;
        let response = self
            .http
            .post(format!("{}/2/files/download", self.content_url))
            .bearer_auth(credential.access_token())
            .header(API_ARG_HEADER, arg)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::from_response(response).await);
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn upload_file(
        &self,
        dest_path: &str,
        bytes: &[u8],
        credential: &Credential,
    ) -> std::result::Result<(), RemoteError> {
        let arg = header_safe_json(&UploadArg {
            path: dest_path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        })?;

        let response = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .bearer_auth(credential.access_token())
            .header(API_ARG_HEADER, arg)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::from_response(response).await);
        }
        Ok(())
    }
}
