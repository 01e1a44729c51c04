//! In-memory fakes for the capability traits, shared by unit tests

use crate::analyzer::Analyzer;
use crate::config::RemoteStoreConfig;
use crate::credentials::{ClientSecrets, Credential};
use crate::error::{Error, RemoteError, Result};
use crate::remote::{RemoteStore, TokenExchanger};
use crate::types::RemoteFile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Remote store settings with all three secrets present
pub(crate) fn complete_remote_config() -> RemoteStoreConfig {
    RemoteStoreConfig {
        refresh_token: Some("refresh-token".into()),
        client_id: Some("client-id".into()),
        client_secret: Some("client-secret".into()),
        ..RemoteStoreConfig::default()
    }
}

/// Token exchanger handing out `token-1`, `token-2`, ... or failing on demand
pub(crate) struct FakeExchanger {
    calls: AtomicU32,
    failing: AtomicBool,
    failure_status: u16,
    delay: Option<Duration>,
}

impl FakeExchanger {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            failing: AtomicBool::new(false),
            failure_status: 400,
            delay: None,
        }
    }

    pub(crate) fn failing_with_status(status: u16) -> Self {
        Self {
            failing: AtomicBool::new(true),
            failure_status: status,
            ..Self::new()
        }
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenExchanger for FakeExchanger {
    async fn exchange_refresh_token(
        &self,
        _secrets: &ClientSecrets,
    ) -> std::result::Result<String, RemoteError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: self.failure_status,
                body: "invalid_grant".into(),
            });
        }
        Ok(format!("token-{n}"))
    }
}

/// Scriptable in-memory remote store
///
/// Paths can be told to answer 401 a fixed number of times before behaving,
/// or to fail permanently with a given error.
#[derive(Default)]
pub(crate) struct FakeStore {
    folders: Mutex<HashMap<String, Vec<RemoteFile>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    rejections: Mutex<HashMap<String, u32>>,
    failures: Mutex<HashMap<String, RemoteError>>,
    uploads: Mutex<HashMap<String, Vec<u8>>>,
    list_calls: AtomicU32,
    download_calls: Mutex<Vec<String>>,
    upload_calls: AtomicU32,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Register a folder listing
    pub(crate) fn folder(&self, path: &str, entries: Vec<RemoteFile>) {
        self.folders
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    /// Register downloadable content
    pub(crate) fn file(&self, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    /// Register a folder of `count` files named `photo-N.jpg` plus content
    pub(crate) fn photo_folder(&self, path: &str, count: usize) -> Vec<RemoteFile> {
        let entries: Vec<RemoteFile> = (1..=count)
            .map(|i| {
                let name = format!("photo-{i}.jpg");
                let remote = format!("{path}/{name}");
                self.file(&remote, format!("jpeg-{i}").as_bytes());
                RemoteFile::file(name, remote)
            })
            .collect();
        self.folder(path, entries.clone());
        entries
    }

    /// Answer 401 for the next `times` calls touching `path`
    pub(crate) fn reject(&self, path: &str, times: u32) {
        self.rejections
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    /// Fail every call touching `path`
    pub(crate) fn fail(&self, path: &str, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.to_string(), error);
    }

    pub(crate) fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn download_calls(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }

    pub(crate) fn download_calls_for(&self, path: &str) -> usize {
        self.download_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| *p == path)
            .count()
    }

    pub(crate) fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn uploaded(&self, path: &str) -> Option<Vec<u8>> {
        self.uploads.lock().unwrap().get(path).cloned()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted(&self, path: &str) -> std::result::Result<(), RemoteError> {
        if let Some(error) = self.failures.lock().unwrap().get(path) {
            return Err(error.clone());
        }
        let mut rejections = self.rejections.lock().unwrap();
        if let Some(remaining) = rejections.get_mut(path)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(RemoteError::Unauthorized);
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_folder(
        &self,
        path: &str,
        _credential: &Credential,
    ) -> std::result::Result<Vec<RemoteFile>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(path)?;
        self.folders
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                status: 409,
                body: "path/not_found".into(),
            })
    }

    async fn download_file(
        &self,
        remote_path: &str,
        _credential: &Credential,
    ) -> std::result::Result<Vec<u8>, RemoteError> {
        self.download_calls
            .lock()
            .unwrap()
            .push(remote_path.to_string());
        self.simulate_latency().await;
        self.scripted(remote_path)?;
        self.files
            .lock()
            .unwrap()
            .get(remote_path)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                status: 409,
                body: "path/not_found".into(),
            })
    }

    async fn upload_file(
        &self,
        dest_path: &str,
        bytes: &[u8],
        _credential: &Credential,
    ) -> std::result::Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(dest_path)?;
        self.uploads
            .lock()
            .unwrap()
            .insert(dest_path.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Analyzer returning a fixed text or a fixed failure
pub(crate) struct FakeAnalyzer {
    outcome: std::result::Result<String, String>,
    delay: Option<Duration>,
    seen: Mutex<Vec<PathBuf>>,
    all_present: AtomicBool,
}

impl FakeAnalyzer {
    pub(crate) fn ok(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            delay: None,
            seen: Mutex::new(Vec::new()),
            all_present: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            ..Self::ok("")
        }
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok("too late")
        }
    }

    /// Paths handed to the last `analyze` call
    pub(crate) fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }

    /// Whether every path existed on disk when `analyze` ran
    pub(crate) fn all_present(&self) -> bool {
        self.all_present.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(&self, paths: &[PathBuf]) -> Result<String> {
        *self.seen.lock().unwrap() = paths.to_vec();
        self.all_present
            .store(paths.iter().all(|p| p.is_file()), Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone().map_err(Error::Analysis)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
