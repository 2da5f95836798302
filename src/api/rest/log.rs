//! Logging endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::api::state::AppState;
use crate::session::{ImageUpload, LogFields, NoteInput, TempTarget};
use crate::types::Assessment;
use crate::validation::{parse_milestone, parse_temperature};

/// Query parameters for `/loaf/start`
#[derive(Debug, Default, Deserialize)]
pub struct StartParams {
    /// Kitchen temperature, °F
    pub temp: Option<String>,
}

/// Query parameters for `/log/:kind`
#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    /// Kitchen temperature, °F
    pub temp: Option<String>,
    /// Dough temperature, °F
    pub dough_temp: Option<String>,
    pub note: Option<String>,
}

/// Optional JSON body of `POST /log/:kind`
#[derive(Debug, Default, Deserialize)]
pub struct LogBody {
    pub assessment: Option<Assessment>,
    pub note: Option<String>,
}

/// Query parameters for `/log/temp/:value`
#[derive(Debug, Default, Deserialize)]
pub struct TempParams {
    /// kitchen (default), dough, loaf or oven
    #[serde(rename = "type")]
    pub target: Option<String>,
}

/// JSON body of `POST /log/note`
#[derive(Debug, Default, Deserialize)]
pub struct NoteBody {
    pub note: Option<String>,
    pub dough_temp_f: Option<f64>,
}

/// GET|POST /loaf/start - Start a new bake
pub async fn start_bake(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> Result<Json<Value>, ApiError> {
    let temp = optional_temperature(params.temp)?;
    let event = state.session.start(temp).await?;
    Ok(Json(json!({ "status": "loaf started", "event": event })))
}

/// GET|POST /log/:kind - Log a milestone
pub async fn log_event(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<LogParams>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_milestone(&kind)?;

    let body: LogBody = if body.iter().all(u8::is_ascii_whitespace) {
        LogBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))?
    };

    let fields = LogFields {
        ambient_temp_f: optional_temperature(params.temp)?,
        dough_temp_f: optional_temperature(params.dough_temp)?,
        note: body.note.or(params.note),
        assessment: body.assessment,
    };

    let event = state.session.log(kind, fields).await?;
    Ok(Json(json!({ "status": "logged", "event": event })))
}

/// GET|POST /log/temp/:value - Log a temperature reading
pub async fn log_temperature(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
    Query(params): Query<TempParams>,
) -> Result<Json<Value>, ApiError> {
    let value = parse_temperature(&value)?;
    let target = TempTarget::from_query(params.target.as_deref());
    let event = state.session.log_temperature(value, target).await?;
    Ok(Json(json!({ "status": "logged", "event": event })))
}

/// POST /log/note - Log a note from JSON or a multipart form with a photo
pub async fn log_note(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let input = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        read_note_form(multipart).await?
    } else {
        let Json(body) = Json::<NoteBody>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        NoteInput {
            text: body.note,
            dough_temp_f: body.dough_temp_f,
            image: None,
        }
    };

    let event = state.session.log_note(input).await?;
    Ok(Json(json!({ "status": "logged", "event": event })))
}

/// Collect the `note`, `dough_temp` and `image` fields of a note form
async fn read_note_form(mut multipart: Multipart) -> Result<NoteInput, ApiError> {
    let mut input = NoteInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "note" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                input.text = Some(text);
            }
            "dough_temp" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                input.dough_temp_f = optional_temperature(Some(text))?;
            }
            "image" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                // An empty file input still sends the field
                if !bytes.is_empty() {
                    input.image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        content_type,
                    });
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(input)
}

/// Blank query values count as absent; anything else must be a valid reading
fn optional_temperature(value: Option<String>) -> Result<Option<f64>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Ok(Some(parse_temperature(raw)?)),
    }
}
