//! Integration tests for the cover/segment server

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_api_prefix_is_mounted() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let response = app
        .oneshot(Request::builder().uri("/api/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_segments_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/segments",
        json!({
            "sample_rate": 10,
            "num_frames": 1000,
            "segment_duration": 30,
            "overlap": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let segments = body["segments"].as_array().unwrap();
    assert_eq!(body["count"], segments.len());
    // 300-frame windows stepping 290: 0, 290, 580, then flush with the end
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[1]["start"], 290);
    assert_eq!(segments[3]["start"], 700);
    assert_eq!(segments[3]["end"], 1000);
    assert_eq!(segments[3]["start_secs"], 70.0);
}

#[tokio::test]
async fn test_segments_endpoint_rejects_large_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/segments",
        json!({
            "sample_rate": 32000,
            "num_frames": 64000,
            "segment_duration": 5,
            "overlap": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Overlap"));
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_cover_endpoint_renders_with_fallback_font() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/cover",
        json!({
            "title": "Extended Melody",
            "description": "lofi piano, seed=42",
            "width": 320,
            "height": 200,
            "font": "not-installed.ttf",
            "font_color": "#000000"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["width"], 320);
    assert_eq!(body["height"], 200);
    assert!(body["image_base64"].as_str().is_some_and(|s| !s.is_empty()));

    let path = std::path::PathBuf::from(body["path"].as_str().unwrap());
    assert!(path.starts_with(dir.path()));
    assert!(path.is_file());
}

#[tokio::test]
async fn test_cover_endpoint_reports_unwritable_output() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let (status, body) = post_json(
        create_test_app(&missing),
        "/cover",
        json!({ "title": "t", "font": "not-installed.ttf" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("temp file"));
    assert_eq!(body["code"], 500);
}

#[tokio::test]
async fn test_segments_endpoint_caps_segment_count() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/segments",
        json!({
            "sample_rate": 1,
            "num_frames": 5_000_000,
            "segment_duration": 2,
            "overlap": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("segments"));
}

#[tokio::test]
async fn test_cover_background_inside_directory() {
    let dir = tempfile::tempdir().unwrap();
    let backgrounds = dir.path().join("backgrounds");
    std::fs::create_dir(&backgrounds).unwrap();
    image::RgbaImage::from_pixel(64, 64, image::Rgba([7, 8, 9, 255]))
        .save(backgrounds.join("paper.png"))
        .unwrap();

    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/cover",
        json!({
            "title": "t",
            "width": 32,
            "height": 32,
            "background_path": "paper.png",
            "font": "not-installed.ttf"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // the result takes the background's size
    assert_eq!(body["width"], 64);
}

#[tokio::test]
async fn test_cover_background_outside_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("backgrounds")).unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let private = elsewhere.path().join("private.png");
    image::RgbaImage::from_pixel(64, 64, image::Rgba([7, 8, 9, 255]))
        .save(&private)
        .unwrap();

    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/cover",
        json!({
            "title": "t",
            "background_path": private,
            "font": "not-installed.ttf"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("image_base64").is_none());
}

#[tokio::test]
async fn test_cover_font_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post_json(
        create_test_app(dir.path()),
        "/cover",
        json!({ "title": "t", "font": "http://169.254.169.254/latest/font.ttf" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Font"));
}

#[tokio::test]
async fn test_cover_endpoint_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = post_json(
        create_test_app(dir.path()),
        "/cover",
        json!({ "title": "t", "width": 10000, "height": 10 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_not_found_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let response = create_test_app(dir.path())
        .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
