//! On-disk staging tree for one addon build
//!
//! ```text
//! <output>/<addon_name>/<version>/            copied server and service files
//! <output>/<addon_name>/<version>/private/    dependency descriptor, client.zip
//! <output>/<addon_name>/.<version>.complete   completion marker
//! <output>/<addon_name>-<version>.zip         distributable archive
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::util::remove_dir_if_exists;
use crate::version::AddonVersion;

/// Name of the private subdirectory
pub const PRIVATE_DIR_NAME: &str = "private";

/// Name of the client code archive inside `private`
pub const CLIENT_ARCHIVE_NAME: &str = "client.zip";

/// Lifecycle of a staging tree as observed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    /// No staging directory for this version
    Absent,
    /// Directory exists but no build finished in it
    Building,
    /// A build finished and its output is still on disk
    Complete,
}

/// Paths of the staging tree for one (addon name, version)
#[derive(Debug, Clone)]
pub struct StagingLayout {
    output_dir: PathBuf,
    addon_name: String,
    version: AddonVersion,
}

impl StagingLayout {
    pub fn new(output_dir: &Path, addon_name: &str, version: &AddonVersion) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            addon_name: addon_name.to_string(),
            version: version.clone(),
        }
    }

    pub fn version(&self) -> &AddonVersion {
        &self.version
    }

    /// `<output>/<addon_name>`, parent of every staged version
    pub fn addon_dir(&self) -> PathBuf {
        self.output_dir.join(&self.addon_name)
    }

    /// `<output>/<addon_name>/<version>`, the staging root
    pub fn root(&self) -> PathBuf {
        self.addon_dir().join(self.version.as_str())
    }

    pub fn private_dir(&self) -> PathBuf {
        self.root().join(PRIVATE_DIR_NAME)
    }

    pub fn client_archive(&self) -> PathBuf {
        self.private_dir().join(CLIENT_ARCHIVE_NAME)
    }

    /// `<output>/<addon_name>-<version>.zip`
    pub fn distributable_archive(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}.zip", self.addon_name, self.version))
    }

    fn marker(&self) -> PathBuf {
        self.addon_dir().join(format!(".{}.complete", self.version))
    }

    pub fn state(&self) -> StagingState {
        if !self.root().is_dir() {
            StagingState::Absent
        } else if self.marker().is_file() {
            StagingState::Complete
        } else {
            StagingState::Building
        }
    }

    /// Delete any previous tree for this version and create an empty one.
    ///
    /// # Errors
    /// Returns an error if removal or creation fails
    pub fn recreate(&self) -> io::Result<()> {
        let root = self.root();
        if remove_dir_if_exists(&root)? {
            info!(path = %root.display(), "removed previous staging tree");
        }
        match fs::remove_file(self.marker()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        fs::create_dir_all(&root)?;
        fs::create_dir_all(self.private_dir())?;
        Ok(())
    }

    /// Record that the staging tree holds a finished build
    ///
    /// # Errors
    /// Returns an error if the marker cannot be written
    pub fn mark_complete(&self) -> io::Result<()> {
        fs::write(self.marker(), self.version.as_str())
    }

    /// Remove the staging trees of every version of this addon
    ///
    /// # Errors
    /// Returns an error if the tree exists and cannot be removed
    pub fn remove_all_versions(&self) -> io::Result<()> {
        let addon_dir = self.addon_dir();
        if remove_dir_if_exists(&addon_dir)? {
            info!(path = %addon_dir.display(), "removed staging directory");
        }
        Ok(())
    }
}
