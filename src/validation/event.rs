//! Boundary checks applied before anything reaches the store

use thiserror::Error;

use crate::types::{Assessment, Event, EventKind, UnknownEventKind};

/// Lowest accepted reading, in °F
pub const MIN_TEMP_F: f64 = 0.0;
/// Highest accepted reading, in °F (covers oven temperatures)
pub const MAX_TEMP_F: f64 = 600.0;

/// Input rejected at the request boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownEventKind),

    #[error("{0} events have their own endpoint")]
    ReservedKind(EventKind),

    #[error("invalid temperature value: {0:?}")]
    InvalidTemperature(String),

    #[error("temperature {0}°F is out of range (0-600)")]
    TemperatureOutOfRange(f64),

    #[error("note cannot be empty without an image")]
    EmptyNote,

    #[error("{field} must be between 1 and 10, got {value}")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("not an image content type: {0:?}")]
    NotAnImage(String),

    #[error("fold_count is only valid on fold events, not {0}")]
    FoldCountOnNonFold(EventKind),

    #[error("an assessment is only valid on loaf-complete, not {0}")]
    AssessmentOnNonTerminal(EventKind),

    #[error("an image is only valid on note events, not {0}")]
    ImageOnNonNote(EventKind),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Parse a milestone kind from a URL segment
///
/// `temperature` and `note` are rejected: they carry required payloads and
/// are logged through dedicated operations.
pub fn parse_milestone(value: &str) -> Result<EventKind, ValidationError> {
    let kind: EventKind = value.parse()?;
    if kind.is_milestone() {
        Ok(kind)
    } else {
        Err(ValidationError::ReservedKind(kind))
    }
}

/// Parse and range-check a temperature given as text
pub fn parse_temperature(value: &str) -> Result<f64, ValidationError> {
    let temp: f64 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidTemperature(value.to_string()))?;
    validate_temperature(temp)
}

/// Range-check a temperature in °F
pub fn validate_temperature(temp_f: f64) -> Result<f64, ValidationError> {
    if !temp_f.is_finite() {
        return Err(ValidationError::InvalidTemperature(temp_f.to_string()));
    }
    if !(MIN_TEMP_F..=MAX_TEMP_F).contains(&temp_f) {
        return Err(ValidationError::TemperatureOutOfRange(temp_f));
    }
    Ok(temp_f)
}

/// Normalize a note; a blank note is only allowed alongside an image
pub fn validate_note(note: Option<&str>, has_image: bool) -> Result<Option<String>, ValidationError> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    match note {
        Some(text) => Ok(Some(text.to_string())),
        None if has_image => Ok(None),
        None => Err(ValidationError::EmptyNote),
    }
}

/// Check the 1-10 scales of an assessment
pub fn validate_assessment(assessment: &Assessment) -> Result<(), ValidationError> {
    for (field, value) in [
        ("crumb_quality", assessment.crumb_quality),
        ("score", assessment.score),
    ] {
        if !(1..=10).contains(&value) {
            return Err(ValidationError::ScoreOutOfRange { field, value });
        }
    }
    Ok(())
}

/// Only `image/*` uploads are stored
pub fn validate_image_type(content_type: &str) -> Result<(), ValidationError> {
    if content_type.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(ValidationError::NotAnImage(content_type.to_string()))
    }
}

/// Kind-specific invariants of a fully built event
///
/// Events keep one flat shape on disk; this is the single place that says
/// which optional fields each kind may carry.
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    if event.fold_count.is_some() && event.kind != EventKind::Fold {
        return Err(ValidationError::FoldCountOnNonFold(event.kind));
    }
    if event.image_ref.is_some() && event.kind != EventKind::Note {
        return Err(ValidationError::ImageOnNonNote(event.kind));
    }
    if let Some(assessment) = event.assessment() {
        if !event.is_completion() {
            return Err(ValidationError::AssessmentOnNonTerminal(event.kind));
        }
        validate_assessment(&assessment)?;
    }
    for temp in [event.ambient_temp_f, event.dough_temp_f, event.oven_temp_f]
        .into_iter()
        .flatten()
    {
        validate_temperature(temp)?;
    }
    Ok(())
}
