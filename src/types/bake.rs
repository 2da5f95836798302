//! Read-only views reconstructed from a bake file

use serde::{Deserialize, Serialize};

use super::assessment::Assessment;
use super::event::Event;

/// A baking session, as rebuilt by replaying its file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bake {
    /// Calendar date of the first event (or of the lookup key)
    pub date: String,

    /// File stem (`bake_<identity>`), empty when no file backs this view
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,

    pub events: Vec<Event>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl Bake {
    /// A bake with no events
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            filename: String::new(),
            events: Vec::new(),
            assessment: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.events.last()
    }

    /// True when the last event is `loaf-complete`
    pub fn is_completed(&self) -> bool {
        self.last_event().is_some_and(Event::is_completion)
    }
}

/// One row of the bake history listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakeSummary {
    /// Bake identity (file key)
    pub date: String,
    /// `YYYY-MM-DD HH:MM` of the first event
    pub start_time: String,
    /// `YYYY-MM-DD HH:MM` of the completion event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub event_count: usize,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl BakeSummary {
    /// Summarize a replayed bake; `None` for a bake without events
    pub fn from_bake(identity: &str, bake: &Bake) -> Option<Self> {
        let first = bake.events.first()?;
        let end_time = bake
            .last_event()
            .filter(|event| event.is_completion())
            .map(|event| event.timestamp.format(SUMMARY_TIME_FORMAT).to_string());

        Some(Self {
            date: identity.to_string(),
            start_time: first.timestamp.format(SUMMARY_TIME_FORMAT).to_string(),
            completed: end_time.is_some(),
            end_time,
            event_count: bake.events.len(),
            assessment: bake.assessment.clone(),
        })
    }
}

const SUMMARY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
