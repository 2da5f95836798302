//! Event types for the bake log
//!
//! Every line in a bake file is one `Event`. Events are immutable once
//! appended; a bake is rebuilt by replaying them in file order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::assessment::Assessment;

/// Key under `data` that carries the post-bake assessment
pub const ASSESSMENT_KEY: &str = "assessment";

/// Baking milestones and readings that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Starter taken out of the fridge; opens a bake
    StarterOut,
    Fed,
    LevainReady,
    Mixed,
    Knead,
    /// Stretch-and-fold; carries a derived `fold_count`
    Fold,
    Shaped,
    FridgeIn,
    FridgeOut,
    OvenIn,
    RemoveLid,
    OvenOut,
    /// Terminal event; closes the bake and carries the assessment
    LoafComplete,
    /// Standalone temperature reading
    Temperature,
    /// Free-text note, optionally with a photo
    Note,
}

impl EventKind {
    /// Every kind, in the order a bake usually goes through them
    pub const ALL: [EventKind; 15] = [
        EventKind::StarterOut,
        EventKind::Fed,
        EventKind::LevainReady,
        EventKind::Mixed,
        EventKind::Knead,
        EventKind::Fold,
        EventKind::Shaped,
        EventKind::FridgeIn,
        EventKind::FridgeOut,
        EventKind::OvenIn,
        EventKind::RemoveLid,
        EventKind::OvenOut,
        EventKind::LoafComplete,
        EventKind::Temperature,
        EventKind::Note,
    ];

    /// Wire name, as stored in the `event` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StarterOut => "starter-out",
            EventKind::Fed => "fed",
            EventKind::LevainReady => "levain-ready",
            EventKind::Mixed => "mixed",
            EventKind::Knead => "knead",
            EventKind::Fold => "fold",
            EventKind::Shaped => "shaped",
            EventKind::FridgeIn => "fridge-in",
            EventKind::FridgeOut => "fridge-out",
            EventKind::OvenIn => "oven-in",
            EventKind::RemoveLid => "remove-lid",
            EventKind::OvenOut => "oven-out",
            EventKind::LoafComplete => "loaf-complete",
            EventKind::Temperature => "temperature",
            EventKind::Note => "note",
        }
    }

    /// Milestones are everything except the two free-form kinds
    pub fn is_milestone(&self) -> bool {
        !matches!(self, EventKind::Temperature | EventKind::Note)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known event kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// One immutable record in a bake file
///
/// The field names on disk are kept compatible with existing bake logs:
/// the ambient (kitchen) reading lives in `temp_f`, the assessment payload
/// in `data.assessment` and the photo reference in `image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the event was logged
    pub timestamp: DateTime<Local>,

    /// What happened
    #[serde(rename = "event")]
    pub kind: EventKind,

    /// Kitchen temperature in °F
    #[serde(rename = "temp_f", default, skip_serializing_if = "Option::is_none")]
    pub ambient_temp_f: Option<f64>,

    /// Dough (or loaf internal) temperature in °F
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dough_temp_f: Option<f64>,

    /// Oven temperature in °F
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oven_temp_f: Option<f64>,

    /// Sequence number of a fold within a run of consecutive folds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fold_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// File name of a stored photo, relative to the bake's image directory
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    /// Open payload; only `loaf-complete` uses it, for the assessment
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl Event {
    /// Create a new event stamped with the current local time
    pub fn new(kind: EventKind) -> Self {
        Self::at(kind, Local::now())
    }

    /// Create a new event with a specific timestamp
    pub fn at(kind: EventKind, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            kind,
            ambient_temp_f: None,
            dough_temp_f: None,
            oven_temp_f: None,
            fold_count: None,
            note: None,
            image_ref: None,
            extra: None,
        }
    }

    pub fn with_ambient_temp(mut self, temp_f: f64) -> Self {
        self.ambient_temp_f = Some(temp_f);
        self
    }

    pub fn with_dough_temp(mut self, temp_f: f64) -> Self {
        self.dough_temp_f = Some(temp_f);
        self
    }

    pub fn with_oven_temp(mut self, temp_f: f64) -> Self {
        self.oven_temp_f = Some(temp_f);
        self
    }

    pub fn with_fold_count(mut self, count: u32) -> Self {
        self.fold_count = Some(count);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_image(mut self, filename: impl Into<String>) -> Self {
        self.image_ref = Some(filename.into());
        self
    }

    /// Attach an assessment under `data.assessment`
    pub fn with_assessment(mut self, assessment: &Assessment) -> Self {
        // Assessment is plain data; serializing it cannot fail.
        if let Ok(value) = serde_json::to_value(assessment) {
            self.extra
                .get_or_insert_with(Map::new)
                .insert(ASSESSMENT_KEY.to_string(), value);
        }
        self
    }

    /// Extract the assessment payload, if this event carries a well-formed one
    pub fn assessment(&self) -> Option<Assessment> {
        let value = self.extra.as_ref()?.get(ASSESSMENT_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// True for the terminal `loaf-complete` event
    pub fn is_completion(&self) -> bool {
        self.kind == EventKind::LoafComplete
    }

    /// Serialize event to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from a JSON line
    pub fn from_json_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }
}
