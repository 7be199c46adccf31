//! Filesystem utility functions
//!
//! This module provides common filesystem operations used across the codebase.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Remove a file, symlink or directory tree if it exists
///
/// Symbolic links are removed themselves, never followed. A missing path is
/// not an error.
///
/// # Returns
/// `true` if something was removed, `false` if the path did not exist
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Make sure an ignore-list file mentions `entry`
///
/// The check is a plain substring match over the whole file, so an entry that
/// already appears anywhere (even as part of a longer line) counts as present.
/// When missing, `\n<entry>` is appended; a missing file is created.
///
/// # Returns
/// `true` if the file was changed
pub fn ensure_ignore_entry(path: &Path, entry: &str) -> io::Result<bool> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    if existing.contains(entry) {
        return Ok(false);
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    write!(file, "\n{}", entry)?;
    Ok(true)
}
