//! Integration tests for the upload endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_file, ScriptedEngine};

// ---------------------------------------------------------------------------
// Test: image upload is stored and described
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_upload_returns_created_with_file_id() {
    let app = common::build_test_app(ScriptedEngine::succeeding(&[])).await;

    let response = post_file(
        app.router.clone(),
        "/api/upload/image",
        "file",
        "face.jpg",
        b"jpeg bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let file_id = json["data"]["file_id"].as_str().expect("file_id");
    assert_eq!(json["data"]["filename"], "face.jpg");
    assert_eq!(json["data"]["size"], 10);

    let stored = app
        .state
        .storage
        .upload_dir()
        .join(format!("{file_id}_face.jpg"));
    assert_eq!(std::fs::read(stored).expect("stored upload"), b"jpeg bytes");
}

// ---------------------------------------------------------------------------
// Test: video extensions are checked case-insensitively
// ---------------------------------------------------------------------------

#[tokio::test]
async fn video_upload_accepts_uppercase_extension() {
    let app = common::build_test_app(ScriptedEngine::succeeding(&[])).await;

    let response = post_file(
        app.router.clone(),
        "/api/upload/video",
        "file",
        "CLIP.MOV",
        b"mov bytes",
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Test: a video sent to the image endpoint is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_kind_is_a_validation_error() {
    let app = common::build_test_app(ScriptedEngine::succeeding(&[])).await;

    let response = post_file(
        app.router.clone(),
        "/api/upload/image",
        "file",
        "clip.mp4",
        b"mp4 bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap_or_default()
        .contains(".jpg, .jpeg, .png"));
}

// ---------------------------------------------------------------------------
// Test: oversized uploads are rejected and leave nothing behind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = common::build_test_app(ScriptedEngine::succeeding(&[])).await;
    let big = vec![0u8; 1024 * 1024 + 1];

    let response = post_file(
        app.router.clone(),
        "/api/upload/video",
        "file",
        "clip.mp4",
        &big,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap_or_default()
        .contains("File too large"));
    let leftovers = std::fs::read_dir(app.state.storage.upload_dir())
        .expect("upload dir")
        .count();
    assert_eq!(leftovers, 0);
}

// ---------------------------------------------------------------------------
// Test: a form without a `file` field is a bad request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let app = common::build_test_app(ScriptedEngine::succeeding(&[])).await;

    let response = post_file(
        app.router.clone(),
        "/api/upload/image",
        "attachment",
        "face.jpg",
        b"jpeg bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}
