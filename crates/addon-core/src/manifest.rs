//! Addon manifest generation

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::archive::{read_entry_to_string, ArchiveError};
use crate::version::AddonVersion;

/// Name of the manifest entry at the root of a distributable archive
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Manifest read by the platform's addon loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonManifest {
    pub addon_name: String,
    pub addon_version: String,
}

impl AddonManifest {
    /// Create a new manifest for the given addon name and version
    #[must_use]
    pub fn new(addon_name: &str, addon_version: &AddonVersion) -> Self {
        Self {
            addon_name: addon_name.to_string(),
            addon_version: addon_version.to_string(),
        }
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load the manifest stored in a distributable archive
    ///
    /// # Errors
    /// Returns an error if the archive has no manifest or it is not valid JSON
    pub fn from_archive(archive_path: &Path) -> Result<Self, ManifestError> {
        let content = read_entry_to_string(archive_path, MANIFEST_FILE_NAME)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors while reading a manifest back
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
