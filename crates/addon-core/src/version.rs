//! Addon version discovery
//!
//! The version is read by static text parsing of the client's version file;
//! the file is never executed. Two shapes are accepted:
//!
//! - an assignment such as `__version__ = "1.2.0"` (or `version: str = '1.2.0'`)
//!   anywhere in the file, first match wins
//! - a file whose only content is the bare version, e.g. `1.2.0`

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::util::{validate_segment, PathError};

/// Default version file name inside the client directory
pub const VERSION_FILE_NAME: &str = "version.py";

/// Errors while reading the addon version
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Failed to read version file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No version assignment found in {0}")]
    NotFound(PathBuf),

    #[error("Version '{version}' cannot be used as a path segment: {source}")]
    Invalid {
        version: String,
        #[source]
        source: PathError,
    },
}

/// Version string identifying one build of an addon
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddonVersion(String);

impl AddonVersion {
    /// Wrap a version string after checking it is usable in paths
    ///
    /// # Errors
    /// Returns an error if the version is empty or contains path syntax
    pub fn new(version: impl Into<String>) -> Result<Self, VersionError> {
        let version = version.into();
        validate_segment(&version).map_err(|source| VersionError::Invalid {
            version: version.clone(),
            source,
        })?;
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^\s*(?:__version__|version)\s*(?::\s*str\s*)?=\s*(?:"([^"\r\n]*)"|'([^'\r\n]*)')"#,
        )
        .expect("version pattern is valid")
    })
}

fn bare_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9A-Za-z][0-9A-Za-z.+_-]*$").expect("bare pattern is valid")
    })
}

/// Extract the version from version file text
pub fn parse_version(content: &str) -> Option<String> {
    if let Some(caps) = assignment_regex().captures(content) {
        return caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string());
    }

    let trimmed = content.trim();
    if !trimmed.is_empty() && !trimmed.contains('\n') && bare_version_regex().is_match(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}

/// Read and validate the addon version from `path`
///
/// # Errors
/// Returns an error if the file is missing, has no version, or the version
/// is not a valid path segment
pub fn read_addon_version(path: &Path) -> Result<AddonVersion, VersionError> {
    let content = std::fs::read_to_string(path).map_err(|source| VersionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let version =
        parse_version(&content).ok_or_else(|| VersionError::NotFound(path.to_path_buf()))?;
    AddonVersion::new(version)
}
