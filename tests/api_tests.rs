//! HTTP API Integration Tests
//!
//! Drives the router with `oneshot` requests against a temporary data
//! directory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

use sourdough_log::api::{create_router, AppState};
use sourdough_log::event_store::TRASH_DIR;
use sourdough_log::{BakeSession, BakeStore, BakeStoreConfig, NoSensor};

fn create_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = BakeStore::open(BakeStoreConfig::new(temp_dir.path())).unwrap();
    let session = BakeSession::new(Arc::new(store), Arc::new(NoSensor));
    (create_router(Arc::new(AppState::new(Arc::new(session)))), temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn request_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let (status, bytes) = send(app, builder.body(body).unwrap()).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    request_json(app, Method::GET, uri, None).await
}

fn current_identity(status: &Value) -> String {
    status["filename"]
        .as_str()
        .unwrap()
        .trim_start_matches("bake_")
        .to_string()
}

#[tokio::test]
async fn test_start_twice_conflicts() {
    let (app, _temp) = create_app();

    let (status, json) = get(&app, "/loaf/start?temp=71").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["event"], "starter-out");
    assert_eq!(json["event"]["temp_f"], 71.0);

    let (status, json) = request_json(&app, Method::POST, "/bake/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn test_log_milestones_and_folds() {
    let (app, _temp) = create_app();
    get(&app, "/loaf/start").await;

    let (status, json) = get(&app, "/log/fold").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["fold_count"], 1);

    let (_, json) = request_json(&app, Method::POST, "/log/fold", None).await;
    assert_eq!(json["event"]["fold_count"], 2);

    let (_, json) = get(&app, "/log/shaped?dough_temp=77&note=tight%20boule").await;
    assert_eq!(json["event"]["dough_temp_f"], 77.0);
    assert_eq!(json["event"]["note"], "tight boule");

    let (_, json) = get(&app, "/log/fold").await;
    assert_eq!(json["event"]["fold_count"], 1);

    let (_, status) = get(&app, "/status").await;
    assert_eq!(status["events"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_log_rejects_bad_input() {
    let (app, _temp) = create_app();

    let (status, json) = get(&app, "/log/proofing").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");

    let (status, _) = get(&app, "/log/temperature").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/log/fed?temp=900").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/log/temp/warm").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_temperature_targets() {
    let (app, _temp) = create_app();

    let (_, json) = get(&app, "/log/temp/72.5").await;
    assert_eq!(json["event"]["event"], "temperature");
    assert_eq!(json["event"]["temp_f"], 72.5);

    let (_, json) = get(&app, "/log/temp/78?type=loaf").await;
    assert_eq!(json["event"]["dough_temp_f"], 78.0);

    let (_, json) = request_json(&app, Method::POST, "/log/temp/475?type=oven", None).await;
    assert_eq!(json["event"]["oven_temp_f"], 475.0);
    assert!(json["event"].get("temp_f").is_none());
}

#[tokio::test]
async fn test_complete_with_assessment() {
    let (app, _temp) = create_app();
    get(&app, "/loaf/start").await;
    get(&app, "/log/oven-out").await;

    let body = json!({
        "assessment": {
            "proof_level": "good",
            "crumb_quality": 8,
            "browning": "good",
            "score": 9,
            "notes": "best one yet"
        }
    });
    let (status, json) = request_json(&app, Method::POST, "/log/loaf-complete", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["data"]["assessment"]["score"], 9);

    let (_, status) = get(&app, "/status").await;
    assert_eq!(status["events"].as_array().unwrap().len(), 0);
    assert_eq!(status["assessment"]["score"], 9);

    let (_, recent) = get(&app, "/api/bake/current").await;
    assert_eq!(recent["events"].as_array().unwrap().len(), 3);
    assert_eq!(recent["assessment"]["proof_level"], "good");

    let (_, bakes) = get(&app, "/api/bakes").await;
    let bakes = bakes.as_array().unwrap();
    assert_eq!(bakes.len(), 1);
    assert_eq!(bakes[0]["completed"], true);
    assert_eq!(bakes[0]["event_count"], 3);
}

#[tokio::test]
async fn test_assessment_rejected_outside_completion() {
    let (app, _temp) = create_app();
    get(&app, "/loaf/start").await;

    let body = json!({
        "assessment": {"proof_level": "over", "crumb_quality": 4, "browning": "slight", "score": 3}
    });
    let (status, _) = request_json(&app, Method::POST, "/log/oven-in", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_score = json!({
        "assessment": {"proof_level": "good", "crumb_quality": 4, "browning": "good", "score": 11}
    });
    let (status, _) = request_json(&app, Method::POST, "/log/loaf-complete", Some(bad_score)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bake_get_and_delete() {
    let (app, temp) = create_app();

    let (status, json) = get(&app, "/api/bake/2025-01-01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");

    get(&app, "/loaf/start").await;
    let (_, status) = get(&app, "/status").await;
    let identity = current_identity(&status);

    let (status, bake) = get(&app, &format!("/api/bake/{identity}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bake["events"].as_array().unwrap().len(), 1);

    let (status, json) =
        request_json(&app, Method::DELETE, &format!("/api/bake/{identity}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "deleted");
    assert!(temp
        .path()
        .join(TRASH_DIR)
        .join(format!("bake_{identity}.jsonl"))
        .exists());

    let (status, _) =
        request_json(&app, Method::DELETE, &format!("/api/bake/{identity}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bakes) = get(&app, "/api/bakes").await;
    assert!(bakes.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_event() {
    let (app, _temp) = create_app();
    get(&app, "/loaf/start").await;
    let (_, logged) = get(&app, "/log/mixed").await;
    let timestamp = logged["event"]["timestamp"].as_str().unwrap().replace('+', "%2B");

    let (status, _) = request_json(
        &app,
        Method::DELETE,
        &format!("/api/bake/current/events/0?timestamp={timestamp}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = request_json(
        &app,
        Method::DELETE,
        &format!("/api/bake/current/events/1?timestamp={timestamp}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["event"], "mixed");

    let (status, _) = request_json(&app, Method::DELETE, "/api/bake/current/events/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = get(&app, "/status").await;
    assert_eq!(status["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_note_json() {
    let (app, _temp) = create_app();

    let (status, json) = request_json(
        &app,
        Method::POST,
        "/log/note",
        Some(json!({"note": "smells like yogurt", "dough_temp_f": 75.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["event"], "note");
    assert_eq!(json["event"]["dough_temp_f"], 75.5);

    let (status, _) = request_json(&app, Method::POST, "/log/note", Some(json!({"note": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_note_with_photo_upload() {
    let (app, _temp) = create_app();
    get(&app, "/loaf/start").await;

    let png = [0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let boundary = "X-SOURDOUGH-BOUNDARY";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\ncrumb shot\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"dough_temp\"\r\n\r\n\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"crumb.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/log/note")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, bytes) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["event"]["note"], "crumb shot");
    assert!(json["event"].get("dough_temp_f").is_none());
    let filename = json["event"]["image"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".png"));

    let (_, status) = get(&app, "/status").await;
    let identity = current_identity(&status);

    let request = Request::builder()
        .uri(format!("/api/images/{identity}/{filename}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let served = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(served.as_ref(), &png);

    let (status, _) = get(&app, &format!("/api/images/{identity}/missing.jpg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
