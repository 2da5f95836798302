//! Replay of bake files into ordered events
//!
//! Replay is tolerant: every line is parsed on its own and a line that does
//! not decode to an `Event` is skipped, so one corrupt line never hides the
//! rest of a bake. Only the strict variant used before a rewrite refuses
//! malformed lines, since rewriting would silently drop them.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::types::{Assessment, Event};

use super::store::{StoreError, StoreResult};

/// Read every decodable event of a file, in file order
pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
    replay_tolerant(path, false)
}

/// Tolerant replay; `quiet` logs skipped lines at debug instead of warn
fn replay_tolerant(path: &Path, quiet: bool) -> io::Result<Vec<Event>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();

    for (line_num, chunk) in reader.split(b'\n').enumerate() {
        let chunk = chunk?;
        let line = chunk.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match Event::from_json_line(line) {
            Ok(event) => events.push(event),
            Err(e) if quiet => {
                tracing::debug!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping malformed event line"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping malformed event line"
                );
            }
        }
    }

    Ok(events)
}

/// Read every event of a file, failing on the first malformed line
pub(crate) fn replay_strict(path: &Path) -> StoreResult<Vec<Event>> {
    let file = File::open(path).map_err(|source| StoreError::io("open", path, source))?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for (line_num, chunk) in reader.split(b'\n').enumerate() {
        let chunk = chunk.map_err(|source| StoreError::io("read", path, source))?;
        let line = chunk.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let event = Event::from_json_line(line).map_err(|source| StoreError::CorruptLine {
            path: path.to_path_buf(),
            line: line_num + 1,
            source,
        })?;
        events.push(event);
    }

    Ok(events)
}

/// A file is closed when its last decodable event is `loaf-complete`
///
/// Unreadable and empty files count as open. Every resolution checks every
/// file, so malformed lines are only reported at debug here.
pub fn is_closed(path: &Path) -> bool {
    replay_tolerant(path, true)
        .map(|events| events.last().is_some_and(Event::is_completion))
        .unwrap_or(false)
}

/// Assessment carried by a terminal `loaf-complete` event
pub fn terminal_assessment(events: &[Event]) -> Option<Assessment> {
    events
        .last()
        .filter(|event| event.is_completion())
        .and_then(Event::assessment)
}

/// The part of a replayed file that belongs to the session still in progress
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurrentView {
    pub events: Vec<Event>,
    /// Set only when the file ends with `loaf-complete`
    pub assessment: Option<Assessment>,
}

/// Trim a replayed file down to its current session
///
/// A file can hold a finished session followed by the start of a new one,
/// so only events after the last `loaf-complete` are current. When the file
/// ends with `loaf-complete` nothing is current, but that event's assessment
/// is kept so the just-finished bake can still be shown.
pub fn reconcile(mut events: Vec<Event>) -> CurrentView {
    let Some(last_complete) = events.iter().rposition(Event::is_completion) else {
        return CurrentView {
            events,
            assessment: None,
        };
    };

    if last_complete + 1 == events.len() {
        return CurrentView {
            events: Vec::new(),
            assessment: terminal_assessment(&events),
        };
    }

    CurrentView {
        events: events.split_off(last_complete + 1),
        assessment: None,
    }
}
