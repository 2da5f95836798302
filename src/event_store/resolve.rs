//! Bake file naming and current-file resolution
//!
//! There is no pointer to the open session anywhere on disk. Every call
//! re-derives it from the directory:
//!
//! ```text
//! bake_*.jsonl ──► sort by mtime (newest first) ──► first file whose last
//!                                                   event is not loaf-complete
//!                                  │ none open
//!                                  ▼
//!                  bake_<now as YYYY-MM-DD_HH-MM-SS>.jsonl (not created yet)
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Local};

use crate::utils::identity_key;

use super::replay::is_closed;
use super::store::{StoreError, StoreResult};

pub const FILE_PREFIX: &str = "bake_";
pub const FILE_SUFFIX: &str = ".jsonl";

/// `bake_<identity>.jsonl`
pub fn bake_file_name(identity: &str) -> String {
    format!("{FILE_PREFIX}{identity}{FILE_SUFFIX}")
}

/// Identity key of a bake file name, if the name matches the pattern
pub fn identity_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|identity| !identity.is_empty())
}

/// Identity key of a bake file path
pub fn identity_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    identity_from_file_name(name).map(str::to_string)
}

/// File name without the `.jsonl` extension (`bake_<identity>`)
pub fn file_stem(identity: &str) -> String {
    format!("{FILE_PREFIX}{identity}")
}

/// Identities come from URLs; refuse anything that could leave the data dir
pub fn is_valid_identity(identity: &str) -> bool {
    !identity.is_empty()
        && !identity.contains("..")
        && !identity.contains(['/', '\\'])
}

/// A bake file found in the data directory
#[derive(Debug, Clone)]
pub(crate) struct BakeFile {
    pub path: PathBuf,
    pub identity: String,
    pub modified: SystemTime,
}

/// List bake files; entries that cannot be inspected are skipped
pub(crate) fn scan(dir: &Path) -> StoreResult<Vec<BakeFile>> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::io("read directory", dir, source))?;
    let mut files = Vec::new();

    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(identity) = name.to_str().and_then(identity_from_file_name) else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        files.push(BakeFile {
            path: entry.path(),
            identity: identity.to_string(),
            modified,
        });
    }

    Ok(files)
}

/// Outcome of resolving "the current bake"
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// An existing file whose session is still in progress
    Open(PathBuf),
    /// No session is open; `path` is where the next one will be created
    Fresh {
        path: PathBuf,
        /// Most recently modified closed file, if any
        last_closed: Option<PathBuf>,
    },
}

impl Resolution {
    /// The file the next append goes to
    pub fn path(&self) -> &Path {
        match self {
            Resolution::Open(path) | Resolution::Fresh { path, .. } => path,
        }
    }
}

/// Decide which file is the current bake
pub(crate) fn resolve_current(dir: &Path, now: DateTime<Local>) -> StoreResult<Resolution> {
    let mut files = scan(dir)?;
    files.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.identity.cmp(&a.identity))
    });

    if let Some(open) = files.iter().find(|file| !is_closed(&file.path)) {
        return Ok(Resolution::Open(open.path.clone()));
    }

    Ok(Resolution::Fresh {
        path: fresh_path(dir, now),
        last_closed: files.first().map(|file| file.path.clone()),
    })
}

/// Path for a new session started at `now`
///
/// A closed file created in the same second would otherwise be reused for
/// the new session, so the timestamp moves forward until the name is free.
fn fresh_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    let mut ts = now;
    loop {
        let path = dir.join(bake_file_name(&identity_key(&ts)));
        if !path.exists() {
            return path;
        }
        ts += Duration::seconds(1);
    }
}
