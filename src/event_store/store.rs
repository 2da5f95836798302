//! Bake Store - append-only bake log storage
//!
//! The BakeStore owns the data directory: it decides which file is the
//! current bake, appends events to it, replays files back into bakes and
//! manages trash and photos. The whole directory is one critical section
//! guarded by a single reader/writer lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset, Local};
use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{Bake, Event};
use crate::utils::{atomic_write_with, cleanup_temp_files, date_key, today};

use super::images::{image_dir, image_file_name, is_safe_file_name, IMAGES_DIR};
use super::replay::{reconcile, replay, replay_strict, terminal_assessment, CurrentView};
use super::resolve::{
    bake_file_name, file_stem, identity_of, is_valid_identity, resolve_current, scan, Resolution,
};

/// Subdirectory that deleted bakes are moved into
pub const TRASH_DIR: &str = "trash";

/// Configuration for the BakeStore
#[derive(Debug, Clone)]
pub struct BakeStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for BakeStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl BakeStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file for a bake identity
    pub fn bake_path(&self, identity: &str) -> PathBuf {
        self.data_dir.join(bake_file_name(identity))
    }

    /// Get path to trash directory
    pub fn trash_dir(&self) -> PathBuf {
        self.data_dir.join(TRASH_DIR)
    }

    /// Get path to images directory
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGES_DIR)
    }
}

/// Result type for BakeStore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in BakeStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create data directory {}: {source}", .path.display())]
    DataDir { path: PathBuf, source: io::Error },

    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed event at {}:{line}: {source}", .path.display())]
    CorruptLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("bake not found: {0}")]
    BakeNotFound(String),

    #[error("invalid bake identity: {0:?}")]
    InvalidIdentity(String),

    #[error("invalid image file name: {0:?}")]
    InvalidFileName(String),

    #[error("a bake is already in progress ({0})")]
    SessionOpen(String),

    #[error("no bake in progress")]
    NoCurrentBake,

    #[error("invalid event index: {index} (bake has {len} events)")]
    InvalidIndex { index: usize, len: usize },

    #[error("timestamp mismatch at index {0}; event may have changed")]
    TimestampMismatch(usize),
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The BakeStore maps bake operations onto a directory of JSONL files
pub struct BakeStore {
    config: BakeStoreConfig,
    lock: RwLock<()>,
}

impl BakeStore {
    /// Open a store, creating the data directory if needed
    ///
    /// Failing to create the directory is fatal: the store cannot be used.
    pub fn open(config: BakeStoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|source| StoreError::DataDir {
            path: config.data_dir.clone(),
            source,
        })?;

        match cleanup_temp_files(&config.data_dir) {
            Ok(0) => {}
            Ok(cleaned) => tracing::info!(cleaned, "removed leftover temp files"),
            Err(e) => tracing::warn!(error = %e, "failed to clean up temp files"),
        }

        Ok(Self {
            config,
            lock: RwLock::new(()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &BakeStoreConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        self.config.data_dir()
    }

    /// Path the next append would go to
    pub fn current_bake_path(&self) -> StoreResult<PathBuf> {
        let _guard = self.lock.read();
        Ok(self.resolve()?.path().to_path_buf())
    }

    /// Append an event to the current bake, creating its file if needed
    ///
    /// Returns the identity of the bake the event went to.
    pub fn append_event(&self, event: &Event) -> StoreResult<String> {
        let _guard = self.lock.write();
        self.append_unlocked(Some(event))
    }

    /// Create the current bake file without writing an event
    pub fn touch(&self) -> StoreResult<String> {
        let _guard = self.lock.write();
        self.append_unlocked(None)
    }

    /// Build an event from the current bake's last event and append it
    ///
    /// Reading the last event and appending happen under one write lock, so
    /// values derived from it (fold counts) cannot be computed twice.
    pub fn append_with<F>(&self, build: F) -> StoreResult<Event>
    where
        F: FnOnce(Option<&Event>) -> Event,
    {
        let _guard = self.lock.write();
        let (_, current) = self.current_view_unlocked()?;
        let event = build(current.events.last());
        self.append_unlocked(Some(&event))?;
        Ok(event)
    }

    /// Append an event only while a bake is in progress
    ///
    /// The open-bake check and the append share one write lock, so an event
    /// that races a `loaf-complete` is dropped instead of opening a new bake.
    /// Returns `None` when nothing was appended.
    pub fn append_if_open(&self, event: &Event) -> StoreResult<Option<String>> {
        let _guard = self.lock.write();
        let (resolution, current) = self.current_view_unlocked()?;
        if !Self::is_in_progress(&resolution, &current) {
            return Ok(None);
        }
        self.append_unlocked(Some(event)).map(Some)
    }

    /// Append the opening event of a new bake
    ///
    /// Fails with `SessionOpen` if a bake is already in progress.
    pub fn start_session(&self, event: &Event) -> StoreResult<String> {
        let _guard = self.lock.write();
        let (resolution, current) = self.current_view_unlocked()?;
        if Self::is_in_progress(&resolution, &current) {
            let identity = identity_of(resolution.path()).unwrap_or_default();
            return Err(StoreError::SessionOpen(identity));
        }
        self.append_unlocked(Some(event))
    }

    /// Read the bake in progress
    ///
    /// Right after completion this is empty but still carries the
    /// assessment of the bake that just finished.
    pub fn read_current_bake(&self) -> StoreResult<Bake> {
        let _guard = self.lock.read();
        let (resolution, current) = self.current_view_unlocked()?;

        let date = current
            .events
            .first()
            .map(|event| date_key(&event.timestamp))
            .unwrap_or_else(today);
        let filename = match &resolution {
            Resolution::Open(path) => identity_of(path)
                .map(|identity| file_stem(&identity))
                .unwrap_or_default(),
            Resolution::Fresh { .. } => String::new(),
        };

        Ok(Bake {
            date,
            filename,
            events: current.events,
            assessment: current.assessment,
        })
    }

    /// Whether a bake is in progress (has events and is not completed)
    pub fn has_current_bake(&self) -> StoreResult<bool> {
        let _guard = self.lock.read();
        let (resolution, current) = self.current_view_unlocked()?;
        Ok(Self::is_in_progress(&resolution, &current))
    }

    /// Most recent event of the bake in progress
    pub fn last_event(&self) -> StoreResult<Option<Event>> {
        let _guard = self.lock.read();
        let (_, mut current) = self.current_view_unlocked()?;
        Ok(current.events.pop())
    }

    /// Read a whole bake file by identity
    ///
    /// Unknown identities yield an empty bake rather than an error.
    pub fn read_bake(&self, identity: &str) -> StoreResult<Bake> {
        if !is_valid_identity(identity) {
            return Ok(Bake::empty(identity));
        }

        let _guard = self.lock.read();
        let path = self.config.bake_path(identity);
        if !path.is_file() {
            return Ok(Bake::empty(identity));
        }

        let events = replay(&path).map_err(|source| StoreError::io("read", &path, source))?;
        Ok(Bake {
            date: identity.to_string(),
            filename: file_stem(identity),
            assessment: terminal_assessment(&events),
            events,
        })
    }

    /// Identities of all bake files, most recent first
    ///
    /// Files are not replayed; a listed bake may be empty.
    pub fn list_bakes(&self) -> StoreResult<Vec<String>> {
        let _guard = self.lock.read();
        let mut identities: Vec<String> = scan(self.data_dir())?
            .into_iter()
            .map(|file| file.identity)
            .collect();
        identities.sort_unstable_by(|a, b| b.cmp(a));
        Ok(identities)
    }

    /// Move a bake file into the trash directory
    ///
    /// Returns the new path of the file.
    pub fn delete_bake(&self, identity: &str) -> StoreResult<PathBuf> {
        if !is_valid_identity(identity) {
            return Err(StoreError::InvalidIdentity(identity.to_string()));
        }

        let _guard = self.lock.write();
        let src = self.config.bake_path(identity);
        if !src.is_file() {
            return Err(StoreError::BakeNotFound(identity.to_string()));
        }

        let trash_dir = self.config.trash_dir();
        fs::create_dir_all(&trash_dir)
            .map_err(|source| StoreError::io("create trash directory", &trash_dir, source))?;

        let dst = trash_dir.join(bake_file_name(identity));
        fs::rename(&src, &dst).map_err(|source| StoreError::io("move to trash", &src, source))?;

        tracing::info!(bake = %identity, "moved bake to trash");
        Ok(dst)
    }

    /// Store a photo for the current bake and return its file name
    ///
    /// The current bake file is created first so the photo directory is
    /// named after the bake that will hold the note.
    pub fn save_image(&self, data: &[u8], content_type: &str) -> StoreResult<String> {
        let _guard = self.lock.write();
        let (_, filename) = self.save_image_unlocked(data, content_type)?;
        Ok(filename)
    }

    /// Save a photo and append the note that references it
    ///
    /// Both happen under one write lock, so the photo's directory and the
    /// note always belong to the same bake.
    pub fn append_note_with_image(
        &self,
        note: Event,
        data: &[u8],
        content_type: &str,
    ) -> StoreResult<Event> {
        let _guard = self.lock.write();
        let (identity, filename) = self.save_image_unlocked(data, content_type)?;
        let note = note.with_image(filename);

        let appended = self.append_unlocked(Some(&note))?;
        debug_assert_eq!(appended, identity);
        Ok(note)
    }

    /// Full path of a stored photo
    pub fn image_path(&self, identity: &str, filename: &str) -> StoreResult<PathBuf> {
        if !is_valid_identity(identity) {
            return Err(StoreError::InvalidIdentity(identity.to_string()));
        }
        if !is_safe_file_name(filename) {
            return Err(StoreError::InvalidFileName(filename.to_string()));
        }
        Ok(image_dir(self.data_dir(), identity).join(filename))
    }

    /// Remove one event from the current bake file
    ///
    /// `index` counts every event in the file and `timestamp` must match the
    /// event at that position. The file is rewritten atomically; a malformed
    /// line aborts the rewrite instead of being dropped.
    pub fn delete_event(
        &self,
        index: usize,
        timestamp: &DateTime<FixedOffset>,
    ) -> StoreResult<Event> {
        let _guard = self.lock.write();
        let path = match self.resolve()? {
            Resolution::Open(path) => path,
            Resolution::Fresh { .. } => return Err(StoreError::NoCurrentBake),
        };

        let mut events = replay_strict(&path)?;
        if index >= events.len() {
            return Err(StoreError::InvalidIndex {
                index,
                len: events.len(),
            });
        }
        if events[index].timestamp != *timestamp {
            return Err(StoreError::TimestampMismatch(index));
        }

        let removed = events.remove(index);
        let lines = events
            .iter()
            .map(Event::to_json_line)
            .collect::<Result<Vec<_>, _>>()?;

        atomic_write_with(&path, |file| {
            for line in &lines {
                writeln!(file, "{}", line)?;
            }
            Ok(())
        })
        .map_err(|source| StoreError::io("rewrite", &path, source))?;

        tracing::info!(path = %path.display(), index, kind = %removed.kind, "deleted event");
        Ok(removed)
    }

    /// Write photo bytes under the current bake; returns (bake identity, file name)
    fn save_image_unlocked(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> StoreResult<(String, String)> {
        let identity = self.append_unlocked(None)?;

        let dir = image_dir(self.data_dir(), &identity);
        fs::create_dir_all(&dir)
            .map_err(|source| StoreError::io("create image directory", &dir, source))?;

        let mut at = Local::now();
        loop {
            let filename = image_file_name(at, content_type);
            let path = dir.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(data)
                        .map_err(|source| StoreError::io("write image", &path, source))?;
                    tracing::info!(bake = %identity, image = %filename, bytes = data.len(), "saved image");
                    return Ok((identity, filename));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    at += Duration::milliseconds(1);
                }
                Err(source) => return Err(StoreError::io("create image", &path, source)),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn write_guard(&self) -> parking_lot::RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    fn resolve(&self) -> StoreResult<Resolution> {
        resolve_current(self.data_dir(), Local::now())
    }

    /// Resolve the current file and replay its current session
    fn current_view_unlocked(&self) -> StoreResult<(Resolution, CurrentView)> {
        let resolution = self.resolve()?;
        let current = match &resolution {
            Resolution::Open(path) => {
                let events =
                    replay(path).map_err(|source| StoreError::io("read", path, source))?;
                reconcile(events)
            }
            // Nothing open: surface the assessment of the bake that just finished.
            Resolution::Fresh {
                last_closed: Some(path),
                ..
            } => replay(path).map(reconcile).unwrap_or_default(),
            Resolution::Fresh {
                last_closed: None, ..
            } => CurrentView::default(),
        };
        Ok((resolution, current))
    }

    fn is_in_progress(resolution: &Resolution, current: &CurrentView) -> bool {
        matches!(resolution, Resolution::Open(_)) && !current.events.is_empty()
    }

    /// Append one JSON line (or just create the file) under a held write lock
    fn append_unlocked(&self, event: Option<&Event>) -> StoreResult<String> {
        let resolution = self.resolve()?;
        let path = resolution.path();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StoreError::io("open", path, source))?;

        if let Some(event) = event {
            let mut line = event.to_json_line()?;
            line.push('\n');
            file.write_all(line.as_bytes())
                .map_err(|source| StoreError::io("write", path, source))?;
            file.sync_all()
                .map_err(|source| StoreError::io("sync", path, source))?;
        }

        let identity = identity_of(path).unwrap_or_default();
        tracing::debug!(bake = %identity, kind = ?event.map(|e| e.kind), "appended to bake file");
        Ok(identity)
    }
}
