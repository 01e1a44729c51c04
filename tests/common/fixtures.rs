//! Mock Dropbox and OpenAI endpoints

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Content served for `photo-N.jpg`
pub fn photo_bytes(n: usize) -> Vec<u8> {
    format!("jpeg-bytes-{n}").into_bytes()
}

/// Lowercased Dropbox path of `photo-N.jpg` inside `folder`
pub fn photo_path(folder: &str, n: usize) -> String {
    format!("{}/photo-{n}.jpg", folder.to_lowercase())
}

fn api_arg_path(req: &Request) -> Option<String> {
    let raw = req.headers.get("dropbox-api-arg")?.to_str().ok()?;
    let arg: serde_json::Value = serde_json::from_str(raw).ok()?;
    arg["path"].as_str().map(str::to_string)
}

/// Token endpoint handing out a fixed access token
pub async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "sl.test-access-token",
            "token_type": "bearer",
            "expires_in": 14400
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Token endpoint rejecting the refresh token
pub async fn mount_rejecting_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token is malformed"
        })))
        .mount(server)
        .await;
}

/// A folder listing with `photos` files plus one subfolder, served in two pages
pub async fn mount_folder(server: &MockServer, folder: &str, photos: usize) {
    let lower = folder.to_lowercase();
    let entry = |n: usize| {
        json!({
            ".tag": "file",
            "name": format!("photo-{n}.jpg"),
            "path_lower": photo_path(folder, n),
            "path_display": format!("{folder}/photo-{n}.jpg"),
        })
    };

    let split = photos / 2;
    let mut first: Vec<serde_json::Value> = (1..=split).map(entry).collect();
    first.push(json!({
        ".tag": "folder",
        "name": "Raw",
        "path_lower": format!("{lower}/raw"),
        "path_display": format!("{folder}/Raw"),
    }));
    let second: Vec<serde_json::Value> = (split + 1..=photos).map(entry).collect();

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": first,
            "cursor": "cursor-1",
            "has_more": true
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": second,
            "cursor": "cursor-2",
            "has_more": false
        })))
        .mount(server)
        .await;
}

/// Download endpoint serving `photo_bytes(n)` for every photo of `folder`
pub async fn mount_downloads(server: &MockServer, folder: &str, photos: usize) {
    for n in 1..=photos {
        let expected = photo_path(folder, n);
        Mock::given(method("POST"))
            .and(path("/2/files/download"))
            .and(move |req: &Request| api_arg_path(req).as_deref() == Some(expected.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(photo_bytes(n)))
            .mount(server)
            .await;
    }
}

/// Answer 401 for the first download of `remote_path`
pub async fn mount_one_rejection(server: &MockServer, remote_path: &str) {
    let expected = remote_path.to_string();
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(move |req: &Request| api_arg_path(req).as_deref() == Some(expected.as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_summary": "expired_access_token/",
            "error": { ".tag": "expired_access_token" }
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;
}

/// Upload endpoint accepting anything
pub async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "portal-draft.txt",
            ".tag": "file"
        })))
        .mount(server)
        .await;
}

/// Chat-completions endpoint answering with `text`
pub async fn mount_analysis(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
        })))
        .mount(server)
        .await;
}

/// Chat-completions endpoint failing with 500
pub async fn mount_failing_analysis(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream overloaded"))
        .mount(server)
        .await;
}

/// Requests the server received on `endpoint`
pub async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .collect()
}

/// `(destination path, body)` of every upload received
pub async fn uploads(server: &MockServer) -> Vec<(String, Vec<u8>)> {
    requests_to(server, "/2/files/upload")
        .await
        .into_iter()
        .filter_map(|r| api_arg_path(&r).map(|p| (p, r.body)))
        .collect()
}
