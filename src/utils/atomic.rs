//! Atomic file rewrites
//!
//! Bake files are append-only except when a single event is deleted. That
//! rewrite goes through a temporary sibling file:
//!
//! 1. Write the new content to `<name>.tmp`
//! 2. Call sync_all() to flush to disk
//! 3. Rename the temp file over the original
//!
//! A crash leaves either the old file or the new one, never a partial file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Suffix of in-flight rewrite files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path of the temp file used to rewrite `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Atomically replace `path` with content produced by `write_fn`
///
/// The temp file is removed if writing fails.
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        write_fn(&mut file)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Remove leftover temp files from interrupted rewrites
///
/// Returns the number of files removed.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TEMP_SUFFIX));

        if is_temp && path.is_file() {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_keeps_full_name() {
        let path = Path::new("/data/bake_2025-10-07.jsonl");
        assert_eq!(
            temp_path_for(path),
            PathBuf::from("/data/bake_2025-10-07.jsonl.tmp")
        );
    }

    #[test]
    fn test_atomic_write_with() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bake_2025-10-07.jsonl");
        fs::write(&path, "{\"event\":\"fed\"}\n{\"event\":\"fold\"}\n").unwrap();

        atomic_write_with(&path, |file| file.write_all(b"{\"event\":\"fed\"}\n")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"event\":\"fed\"}\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_failed_write_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bake_2025-10-07.jsonl");
        fs::write(&path, "original\n").unwrap();

        let result = atomic_write_with(&path, |_| Err(io::Error::other("boom")));

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_cleanup_temp_files() {
        let temp_dir = TempDir::new().unwrap();

        for name in ["bake_a.jsonl.tmp", "bake_b.jsonl.tmp", "bake_c.jsonl"] {
            fs::write(temp_dir.path().join(name), "{}\n").unwrap();
        }

        assert_eq!(cleanup_temp_files(temp_dir.path()).unwrap(), 2);

        assert!(!temp_dir.path().join("bake_a.jsonl.tmp").exists());
        assert!(temp_dir.path().join("bake_c.jsonl").exists());
    }
}
