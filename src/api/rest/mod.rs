//! REST API module for HTTP endpoints
//!
//! Logging endpoints (`log`):
//! - `GET|POST /loaf/start` - Start a bake (`/bake/start` is kept as an alias)
//! - `GET|POST /log/:kind` - Log a milestone
//! - `GET|POST /log/temp/:value` - Log a temperature reading
//! - `POST /log/note` - Log a note, optionally with a photo
//!
//! Read and maintenance endpoints (`bakes`):
//! - `GET /status` - Current bake
//! - `GET /api/bake/current` - Current bake, or the most recent one
//! - `GET|DELETE /api/bake/:id` - One bake
//! - `DELETE /api/bake/current/events/:index` - Remove one event
//! - `GET /api/bakes` - Bake history
//! - `GET /api/images/:id/:filename` - Stored photo

pub mod bakes;
pub mod log;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::event_store::StoreError;
use crate::session::{BakeSession, SessionError, SessionResult};
use crate::validation::ValidationError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Run a synchronous session call on the blocking pool
pub(crate) async fn run_blocking<T, F>(session: &Arc<BakeSession>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&BakeSession) -> SessionResult<T> + Send + 'static,
    T: Send + 'static,
{
    let session = Arc::clone(session);
    let result = tokio::task::spawn_blocking(move || op(&session))
        .await
        .map_err(SessionError::from)?;
    Ok(result?)
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::SessionOpen(_) | StoreError::TimestampMismatch(_) => {
                ApiError::conflict(message)
            }
            StoreError::BakeNotFound(_) | StoreError::NoCurrentBake => ApiError::not_found(message),
            StoreError::InvalidIdentity(_)
            | StoreError::InvalidFileName(_)
            | StoreError::InvalidIndex { .. } => ApiError::bad_request(message),
            StoreError::DataDir { .. }
            | StoreError::Io { .. }
            | StoreError::Encode(_)
            | StoreError::CorruptLine { .. } => {
                tracing::error!(error = %err, "store operation failed");
                ApiError::internal(message)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(e) => e.into(),
            SessionError::Store(e) => e.into(),
            SessionError::Task(e) => {
                tracing::error!(error = %e, "store task failed");
                ApiError::internal(format!("store task failed: {e}"))
            }
        }
    }
}
