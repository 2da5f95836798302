//! Photo storage layout
//!
//! Photos live under `images/bake_<identity>/<millis>.<ext>`; note events
//! only keep the file name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::resolve::file_stem;

pub const IMAGES_DIR: &str = "images";

/// File extension for an image content type
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "jpg",
    }
}

/// Content type to serve a stored photo with, from its extension
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Millisecond-timestamp file name for a new photo
pub fn image_file_name(at: DateTime<Local>, content_type: &str) -> String {
    format!("{}.{}", at.timestamp_millis(), extension_for(content_type))
}

/// A single path component that stays inside its parent directory
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains("..") && !name.contains(['/', '\\'])
}

/// Directory holding the photos of one bake
pub(crate) fn image_dir(data_dir: &Path, identity: &str) -> PathBuf {
    data_dir.join(IMAGES_DIR).join(file_stem(identity))
}
