//! Breadth-first file discovery with name filters and subtree exclusion

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::filter::RuleSet;

/// Errors during file collection
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to inspect {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file found under a scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute (or root-joined) path to the source file
    pub source: PathBuf,
    /// Path relative to the scan root
    pub relative: PathBuf,
}

impl DiscoveredFile {
    /// Relative path with `/` separators, as used for archive entries
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Explicit sequence of directory names below a scan root to skip
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExcludedSubtree {
    segments: Vec<String>,
}

impl ExcludedSubtree {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `vendor/pkgA` (either separator) into segments
    pub fn parse(value: &str) -> Self {
        Self::new(
            value
                .split(['/', '\\'])
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn is(&self, parents: &[String]) -> bool {
        self.segments.as_slice() == parents
    }
}

/// Collect every file under `root` that survives the filters.
///
/// Directories are visited breadth-first. A directory whose segment list
/// relative to `root` equals one of `excluded` is never listed, so its whole
/// subtree is dropped. Result order follows directory-listing order and is
/// not meaningful.
///
/// # Errors
/// Fails on the first directory that cannot be read or entry that cannot be
/// inspected, including dangling symlinks.
pub fn collect_files(
    root: &Path,
    file_rules: &RuleSet,
    dir_rules: &RuleSet,
    excluded: &[ExcludedSubtree],
) -> Result<Vec<DiscoveredFile>, CollectError> {
    let mut output = Vec::new();
    let mut queue: VecDeque<(PathBuf, Vec<String>)> = VecDeque::new();
    queue.push_back((root.to_path_buf(), Vec::new()));

    while let Some((dir, parents)) = queue.pop_front() {
        if excluded.iter().any(|subtree| subtree.is(&parents)) {
            debug!(dir = %dir.display(), "skipping excluded subtree");
            continue;
        }

        let entries = fs::read_dir(&dir).map_err(|source| CollectError::ReadDir {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| CollectError::ReadDir {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            // Follows symlinks; a dangling link fails the walk
            let metadata = fs::metadata(&path).map_err(|source| CollectError::Metadata {
                path: path.clone(),
                source,
            })?;

            if metadata.is_file() {
                if file_rules.matches(&name) {
                    continue;
                }
                let relative: PathBuf = parents.iter().chain(std::iter::once(&name)).collect();
                output.push(DiscoveredFile {
                    source: path,
                    relative,
                });
            } else if metadata.is_dir() {
                if dir_rules.matches(&name) {
                    continue;
                }
                let mut segments = parents.clone();
                segments.push(name);
                queue.push_back((path, segments));
            }
        }
    }

    Ok(output)
}
