use super::*;
use crate::config::Config;
use crate::test_helpers::{FakeAnalyzer, FakeExchanger, FakeStore, complete_remote_config};
use crate::{InMemoryPathResolver, PipelineOrchestrator};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Router wired to in-memory fakes
struct TestApp {
    _temp: TempDir,
    store: Arc<FakeStore>,
    resolver: Arc<InMemoryPathResolver>,
    state: AppState,
    config: ApiConfig,
}

impl TestApp {
    fn new(analyzer: FakeAnalyzer) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.remote = complete_remote_config();
        config.workspace.root_dir = temp.path().join("ws");

        let store = Arc::new(FakeStore::new());
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            store.clone(),
            Arc::new(FakeExchanger::new()),
            Arc::new(analyzer),
            &config,
        ));
        let resolver = Arc::new(InMemoryPathResolver::new(config.api.token_validity));

        Self {
            _temp: temp,
            store,
            state: AppState::new(orchestrator, resolver.clone()),
            resolver,
            config: config.api,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone(), &self.config)
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_shuts_down_gracefully() {
    let app = TestApp::new(FakeAnalyzer::ok("unused"));
    let mut config = app.config.clone();
    config.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn({
        let state = app.state.clone();
        async move {
            start_api_server(state, &config, async {
                rx.await.ok();
            })
            .await
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = TestApp::new(FakeAnalyzer::ok("unused"));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut app = TestApp::new(FakeAnalyzer::ok("unused"));
    app.config.cors_enabled = false;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
