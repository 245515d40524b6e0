//! Package assembly: staging tree, client archive and distributable archive
//!
//! A build runs these steps in order, each committed to disk as it goes:
//!
//! 1. read the addon version from the version file
//! 2. recreate `<output>/<addon>/<version>/` and its `private/` directory
//! 3. copy the version file into the staging root
//! 4. copy the server directory's entries into the staging root
//! 5. copy the service directory's top-level files into the staging root
//! 6. copy the dependency descriptor into `private/`
//! 7. archive the filtered client directory as `private/client.zip`
//! 8. optionally write `<output>/<addon>-<version>.zip` with `manifest.json`
//!    and the staged tree under `addon/`, then drop the staging tree
//!
//! There is no rollback: a failure midway leaves the partial staging tree in
//! the `Building` state.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::ArchiveWriter;
use crate::collect::{collect_files, ExcludedSubtree};
use crate::error::{PackageError, PackageResult};
use crate::filter::RuleSet;
use crate::manifest::{AddonManifest, MANIFEST_FILE_NAME};
use crate::staging::{StagingLayout, StagingState};
use crate::util::{copy_dir_recursive, remove_dir_if_exists, validate_segment};
use crate::version::{read_addon_version, VERSION_FILE_NAME};

/// Prefix of staged files inside the distributable archive
pub const ADDON_ARCHIVE_PREFIX: &str = "addon";

/// Inputs and switches for one package build
#[derive(Debug, Clone)]
pub struct PackageOptions {
    addon_name: String,
    output_dir: PathBuf,
    client_dir: Option<PathBuf>,
    server_dir: Option<PathBuf>,
    service_dir: Option<PathBuf>,
    dependency_descriptor: Option<PathBuf>,
    version_file: Option<PathBuf>,
    make_final_zip: bool,
    keep_staging: bool,
    clear_output_dir: bool,
    overwrite_complete: bool,
    excluded_client_subtrees: Vec<ExcludedSubtree>,
    file_rules: RuleSet,
    dir_rules: RuleSet,
}

impl PackageOptions {
    /// Options for `addon_name` built into `output_dir`, producing the final
    /// archive and discarding the staging tree.
    pub fn new(addon_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            addon_name: addon_name.into(),
            output_dir: output_dir.into(),
            client_dir: None,
            server_dir: None,
            service_dir: None,
            dependency_descriptor: None,
            version_file: None,
            make_final_zip: true,
            keep_staging: false,
            clear_output_dir: false,
            overwrite_complete: false,
            excluded_client_subtrees: Vec::new(),
            file_rules: RuleSet::default_files(),
            dir_rules: RuleSet::default_dirs(),
        }
    }

    #[must_use]
    pub fn with_client_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_server_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.server_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_service_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.service_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_dependency_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependency_descriptor = Some(path.into());
        self
    }

    /// Read the version from this file instead of `<client_dir>/version.py`
    #[must_use]
    pub fn with_version_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.version_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_final_zip(mut self, make_final_zip: bool) -> Self {
        self.make_final_zip = make_final_zip;
        self
    }

    #[must_use]
    pub fn with_keep_staging(mut self, keep_staging: bool) -> Self {
        self.keep_staging = keep_staging;
        self
    }

    /// Wipe the whole output directory before building
    #[must_use]
    pub fn with_clear_output_dir(mut self, clear: bool) -> Self {
        self.clear_output_dir = clear;
        self
    }

    /// Allow rebuilding over a staging tree in the `Complete` state
    #[must_use]
    pub fn with_overwrite_complete(mut self, overwrite: bool) -> Self {
        self.overwrite_complete = overwrite;
        self
    }

    #[must_use]
    pub fn with_excluded_client_subtrees(mut self, subtrees: Vec<ExcludedSubtree>) -> Self {
        self.excluded_client_subtrees = subtrees;
        self
    }

    /// Replace the default file rules entirely
    #[must_use]
    pub fn with_file_rules(mut self, rules: RuleSet) -> Self {
        self.file_rules = rules;
        self
    }

    /// Replace the default directory rules entirely
    #[must_use]
    pub fn with_dir_rules(mut self, rules: RuleSet) -> Self {
        self.dir_rules = rules;
        self
    }

    pub fn addon_name(&self) -> &str {
        &self.addon_name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Version file to read: explicit, or `version.py` in the client dir
    pub fn version_file(&self) -> Option<PathBuf> {
        self.version_file
            .clone()
            .or_else(|| self.client_dir.as_ref().map(|d| d.join(VERSION_FILE_NAME)))
    }
}

/// What a build left on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Distributable archive path
    Archive(PathBuf),
    /// Staging root, when no final archive was requested
    Staging(PathBuf),
}

impl PackageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(p) | Self::Staging(p) => p,
        }
    }
}

/// Treat a configured path that does not exist as not configured
fn existing<'a>(path: Option<&'a PathBuf>, label: &str) -> Option<&'a Path> {
    let path = path?;
    if path.exists() {
        Some(path.as_path())
    } else {
        warn!(path = %path.display(), "{label} not found, skipping");
        None
    }
}

fn copy_file(from: &Path, to: &Path) -> PackageResult<()> {
    fs::copy(from, to).map_err(|source| PackageError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn file_name(path: &Path) -> PackageResult<std::ffi::OsString> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_os_string());
    }
    let canonical = fs::canonicalize(path)?;
    canonical.file_name().map(std::ffi::OsStr::to_os_string).ok_or_else(|| {
        PackageError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        ))
    })
}

/// Copy every top-level entry of the server directory into `dest`
fn copy_server_dir(server_dir: &Path, dest: &Path) -> PackageResult<()> {
    for entry in fs::read_dir(server_dir)? {
        let entry = entry?;
        let source = entry.path();
        let target = dest.join(entry.file_name());
        if source.is_dir() {
            copy_dir_recursive(&source, &target).map_err(|e| PackageError::Copy {
                from: source.clone(),
                to: target.clone(),
                source: e,
            })?;
        } else {
            copy_file(&source, &target)?;
        }
    }
    Ok(())
}

/// Copy the top-level files of the service directory into `dest`
fn copy_service_dir(service_dir: &Path, dest: &Path) -> PackageResult<()> {
    for entry in fs::read_dir(service_dir)? {
        let entry = entry?;
        let source = entry.path();
        if !source.is_file() {
            debug!(path = %source.display(), "skipping non-file service entry");
            continue;
        }
        copy_file(&source, &dest.join(entry.file_name()))?;
    }
    Ok(())
}

/// Archive the filtered client directory with entries under its own name
fn write_client_archive(
    client_dir: &Path,
    archive_path: &Path,
    options: &PackageOptions,
) -> PackageResult<usize> {
    let client_name = file_name(client_dir)?.to_string_lossy().into_owned();
    let mut files = collect_files(
        client_dir,
        &options.file_rules,
        &options.dir_rules,
        &options.excluded_client_subtrees,
    )?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut writer = ArchiveWriter::create(archive_path)?;
    for file in &files {
        writer.add_file(&file.source, &format!("{client_name}/{}", file.archive_name()))?;
    }
    let count = writer.entry_count();
    writer.finish()?;
    Ok(count)
}

/// Write the distributable archive: manifest plus the mirrored staging tree
fn write_distributable(layout: &StagingLayout, addon_name: &str) -> PackageResult<PathBuf> {
    let manifest = AddonManifest::new(addon_name, layout.version());
    let mut writer = ArchiveWriter::create(&layout.distributable_archive())?;
    writer.add_bytes(MANIFEST_FILE_NAME, manifest.to_json()?.as_bytes())?;
    writer.add_dir_tree(&layout.root(), ADDON_ARCHIVE_PREFIX)?;
    Ok(writer.finish()?)
}

/// Build an addon package.
///
/// Returns the distributable archive path, or the staging root when the
/// final archive is disabled.
///
/// # Errors
/// Fails if the version cannot be determined, if a completed staging tree
/// would be overwritten without permission, or on any file-system error.
pub fn build_package(options: &PackageOptions) -> PackageResult<PackageOutcome> {
    validate_segment(&options.addon_name)?;

    let version_file = options.version_file().ok_or(PackageError::NoVersionFile)?;
    let version = read_addon_version(&version_file)?;
    info!(addon = %options.addon_name, version = %version, "building addon package");

    let client_dir = existing(options.client_dir.as_ref(), "client directory");
    let server_dir = existing(options.server_dir.as_ref(), "server directory");
    let service_dir = existing(options.service_dir.as_ref(), "service directory");
    let descriptor = existing(options.dependency_descriptor.as_ref(), "dependency descriptor");

    if options.clear_output_dir && remove_dir_if_exists(&options.output_dir)? {
        info!(path = %options.output_dir.display(), "cleared output directory");
    }
    fs::create_dir_all(&options.output_dir)?;

    let layout = StagingLayout::new(&options.output_dir, &options.addon_name, &version);
    if layout.state() == StagingState::Complete && !options.overwrite_complete {
        return Err(PackageError::StagingComplete { path: layout.root() });
    }
    layout.recreate()?;
    let root = layout.root();

    copy_file(&version_file, &root.join(file_name(&version_file)?))?;

    if let Some(server_dir) = server_dir {
        info!(path = %server_dir.display(), "copying server files");
        copy_server_dir(server_dir, &root)?;
    }

    if let Some(service_dir) = service_dir {
        info!(path = %service_dir.display(), "copying service files");
        copy_service_dir(service_dir, &root)?;
    }

    if let Some(descriptor) = descriptor {
        copy_file(descriptor, &layout.private_dir().join(file_name(descriptor)?))?;
    }

    if let Some(client_dir) = client_dir {
        let count = write_client_archive(client_dir, &layout.client_archive(), options)?;
        info!(files = count, path = %layout.client_archive().display(), "wrote client archive");
    }

    layout.mark_complete()?;

    if !options.make_final_zip {
        return Ok(PackageOutcome::Staging(root));
    }

    let archive = write_distributable(&layout, &options.addon_name)?;
    info!(path = %archive.display(), "wrote distributable archive");

    if !options.keep_staging {
        layout.remove_all_versions()?;
    }

    Ok(PackageOutcome::Archive(archive))
}
