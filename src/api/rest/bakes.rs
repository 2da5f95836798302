//! Bake read and maintenance endpoints

use std::io;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{run_blocking, ApiError};
use crate::api::state::AppState;
use crate::event_store::images::content_type_for;
use crate::session::BakeSession;
use crate::types::{Bake, BakeSummary};

/// Query parameters for deleting an event
#[derive(Debug, Deserialize)]
pub struct DeleteEventParams {
    /// RFC 3339 timestamp of the event being deleted
    pub timestamp: Option<String>,
}

/// GET /status - The bake in progress
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Bake>, ApiError> {
    let bake = run_blocking(&state.session, BakeSession::current_bake).await?;
    Ok(Json(bake))
}

/// GET /api/bake/current - The bake in progress, or the most recent bake
pub async fn current_or_recent(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Bake>, ApiError> {
    let bake = run_blocking(&state.session, BakeSession::current_or_recent).await?;
    Ok(Json(bake))
}

/// GET /api/bake/:id - One bake by identity
pub async fn get_bake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Bake>, ApiError> {
    let identity = id.clone();
    let bake = run_blocking(&state.session, move |session| session.bake(&identity)).await?;
    if bake.is_empty() {
        return Err(ApiError::not_found(format!("bake not found: {id}")));
    }
    Ok(Json(bake))
}

/// DELETE /api/bake/:id - Move a bake to the trash
pub async fn delete_bake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let identity = id.clone();
    run_blocking(&state.session, move |session| session.delete_bake(&identity)).await?;
    Ok(Json(json!({ "status": "deleted", "date": id })))
}

/// DELETE /api/bake/current/events/:index - Remove one event of the current bake
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Query(params): Query<DeleteEventParams>,
) -> Result<Json<Value>, ApiError> {
    let timestamp = params
        .timestamp
        .ok_or_else(|| ApiError::bad_request("timestamp query parameter is required"))?;
    let removed = run_blocking(&state.session, move |session| {
        session.delete_event(index, &timestamp)
    })
    .await?;
    Ok(Json(json!({ "status": "deleted", "event": removed })))
}

/// GET /api/bakes - Summaries of all bakes, most recent first
pub async fn list_bakes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BakeSummary>>, ApiError> {
    let summaries = run_blocking(&state.session, BakeSession::summaries).await?;
    Ok(Json(summaries))
}

/// GET /api/images/:id/:filename - A stored photo
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.session.store().image_path(&id, &filename)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ApiError::not_found(format!("image not found: {filename}")),
        _ => {
            tracing::error!(path = %path.display(), error = %e, "failed to read image");
            ApiError::internal(format!("failed to read image: {e}"))
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes))
}
