//! Path helpers shared by the packaging steps

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors related to names used as path segments
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("Name is empty")]
    Empty,

    #[error("Name contains path separator: {0}")]
    Separator(String),

    #[error("Name contains parent directory reference: {0}")]
    ParentReference(String),

    #[error("Name cannot start with dot: {0}")]
    Hidden(String),

    #[error("Name contains null byte")]
    NullByte,
}

/// Validate a name (addon name, version) for use as a single path segment
///
/// # Errors
/// Returns an error if the name is invalid
pub fn validate_segment(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::Empty);
    }

    if name.contains('/') || name.contains('\\') {
        return Err(PathError::Separator(name.to_string()));
    }

    if name.contains("..") {
        return Err(PathError::ParentReference(name.to_string()));
    }

    if name.starts_with('.') {
        return Err(PathError::Hidden(name.to_string()));
    }

    if name.contains('\0') {
        return Err(PathError::NullByte);
    }

    Ok(())
}

/// Recursively copy a directory and everything below it into `dst`.
///
/// Symlinks are followed, so linked directories are copied as content.
///
/// # Errors
/// Returns an error on the first entry that fails to copy
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let relative_path = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target_path = dst.join(relative_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target_path)?;
        } else {
            fs::copy(entry.path(), &target_path)?;
        }
    }

    Ok(())
}

/// Remove a directory tree if present
///
/// # Errors
/// Returns an error if the tree exists and cannot be removed
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
