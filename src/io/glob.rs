//! Expansion of input locations into the list of files to read.
//!
//! An input location is either a glob pattern (`logs/*.txt`,
//! `events/day=*/part-*`), a directory (all files directly inside it), or a
//! single file. Files whose name starts with `.` or `_` are treated as metadata
//! (`_SUCCESS`, `.part-0000.crc`) and skipped, except when named explicitly.

use anyhow::{Context, Result, bail};
use glob::glob;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

/// Whether a file name marks job metadata rather than data.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n.starts_with('_'))
}

/// Expand `location` into a sorted list of data files.
///
/// A location that does not exist and contains no glob metacharacters is an
/// error; a pattern that matches nothing yields an empty list.
///
/// # Errors
/// Returns an error for invalid patterns, missing plain paths, or I/O failures
/// while listing directories.
pub fn list_input_files(location: &str) -> Result<Vec<PathBuf>> {
    let as_path = Path::new(location);
    if as_path.is_dir() {
        return list_dir(as_path);
    }
    if as_path.is_file() {
        return Ok(vec![as_path.to_path_buf()]);
    }
    if !location.contains(['*', '?', '[']) {
        bail!("path does not exist: {location}");
    }

    let entries = glob(location).with_context(|| format!("invalid glob pattern: {location}"))?;
    let mut files = Vec::new();
    for entry in entries {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {location}"))?;
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("list {}", dir.display()))?
            .path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
