//! Test configuration pointing every endpoint at one mock server

use portal_draft::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Configuration with fake secrets, all endpoints on `server`, and
/// workspaces created under `workspace_root`
pub fn mock_config(server: &MockServer, workspace_root: &Path) -> Config {
    let mut config = Config::default();

    config.remote.refresh_token = Some("test-refresh-token".to_string());
    config.remote.client_id = Some("test-client-id".to_string());
    config.remote.client_secret = Some("test-client-secret".to_string());
    config.remote.token_url = format!("{}/oauth2/token", server.uri());
    config.remote.api_url = server.uri();
    config.remote.content_url = server.uri();
    config.remote.request_timeout = Duration::from_secs(5);

    config.analyzer.api_key = Some("sk-test".to_string());
    config.analyzer.base_url = format!("{}/v1", server.uri());
    config.analyzer.request_timeout = Duration::from_secs(5);

    config.workspace.root_dir = workspace_root.to_path_buf();
    config.transfer.pipeline_timeout = Duration::from_secs(30);

    config
}

/// Number of workspace directories currently on disk
pub fn live_workspaces(workspace_root: &Path) -> usize {
    std::fs::read_dir(workspace_root)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
