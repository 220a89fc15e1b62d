//! Common utilities for integration tests

use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use musicgen_core::FontConfig;
use server::config::ServerConfig;
use server::{create_app, AppState};
use tower::ServiceExt;

/// Create a test app that never touches the network for fonts, writes
/// covers into `output_dir` and reads backgrounds from `output_dir/backgrounds`
pub fn create_test_app(output_dir: &Path) -> Router {
    let config = ServerConfig {
        cover_output_dir: Some(output_dir.to_path_buf()),
        cover_background_dir: Some(output_dir.join("backgrounds")),
        fonts: FontConfig {
            space_id: None,
            assets_dir: output_dir.join("assets"),
            font_dirs: Vec::new(),
            http_timeout: None,
        },
        ..ServerConfig::default()
    };
    create_app(AppState::new(config))
}

/// POST a JSON body and return status plus parsed JSON response
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
