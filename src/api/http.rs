//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{bakes, log};
use super::state::AppState;

/// Largest accepted request body (photo uploads)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // Logging shortcuts are opened from phones and other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Logging endpoints
        .route("/loaf/start", get(log::start_bake).post(log::start_bake))
        .route("/bake/start", get(log::start_bake).post(log::start_bake))
        .route("/log/note", post(log::log_note))
        .route(
            "/log/temp/:value",
            get(log::log_temperature).post(log::log_temperature),
        )
        .route("/log/:kind", get(log::log_event).post(log::log_event))
        // Read and maintenance endpoints
        .route("/status", get(bakes::status))
        .route("/api/bake/current", get(bakes::current_or_recent))
        .route(
            "/api/bake/current/events/:index",
            delete(bakes::delete_event),
        )
        .route(
            "/api/bake/:id",
            get(bakes::get_bake).delete(bakes::delete_bake),
        )
        .route("/api/bakes", get(bakes::list_bakes))
        .route("/api/images/:id/:filename", get(bakes::get_image))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{BakeStore, BakeStoreConfig};
    use crate::sensor::NoSensor;
    use crate::session::BakeSession;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let temp_dir = TempDir::new().unwrap();
        let store = BakeStore::open(BakeStoreConfig::new(temp_dir.path())).unwrap();
        let session = BakeSession::new(Arc::new(store), Arc::new(NoSensor));
        let app = create_router(Arc::new(AppState::new(Arc::new(session))));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
