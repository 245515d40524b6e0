//! Deflate zip archives: writing, listing and long-path aware extraction

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Errors during archive creation or extraction
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Archive entry escapes extraction directory: {0}")]
    UnsafeEntry(String),

    #[error("Archive entry not found: {0}")]
    MissingEntry(String),
}

/// Whether extraction targets are rewritten as extended-length paths.
///
/// Resolve once with [`LongPathMode::detect`] and pass it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPathMode {
    /// Use target paths as given
    Disabled,
    /// Prefix target paths with `\\?\` (or `\\?\UNC\` for network paths)
    Extended,
}

impl LongPathMode {
    /// Extended on Windows, where paths are limited to `MAX_PATH` (260)
    /// characters unless prefixed.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Extended
        } else {
            Self::Disabled
        }
    }

    /// Rewrite an extraction target for this mode
    ///
    /// # Errors
    /// Returns an error if the current directory is needed and unavailable
    pub fn apply(self, target: &Path) -> io::Result<PathBuf> {
        match self {
            Self::Disabled => Ok(target.to_path_buf()),
            Self::Extended => {
                let absolute = absolutize(target)?;
                Ok(PathBuf::from(extended_length_path(&absolute.to_string_lossy())))
            }
        }
    }
}

/// Prefix a Windows path so the legacy length limit does not apply.
///
/// `\\server\share\x` becomes `\\?\UNC\server\share\x`, anything else gets a
/// plain `\\?\` prefix. Already-prefixed paths are returned unchanged.
pub fn extended_length_path(path: &str) -> String {
    let path = path.replace('/', "\\");
    if path.starts_with(r"\\?\") {
        path
    } else if let Some(rest) = path.strip_prefix(r"\\") {
        format!(r"\\?\UNC\{rest}")
    } else {
        format!(r"\\?\{path}")
    }
}

/// Make a path absolute and drop `.`/`..` lexically; extended-length paths
/// are not normalized by the OS.
fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Streaming writer for a deflate-compressed zip file
pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    options: FileOptions,
    path: PathBuf,
    entries: usize,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::create(path)?;
        Ok(Self {
            zip: ZipWriter::new(file),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            path: path.to_path_buf(),
            entries: 0,
        })
    }

    /// Add a file from disk under `name`, keeping its permission bits
    ///
    /// # Errors
    /// Returns an error if the source cannot be read or the entry written
    pub fn add_file(&mut self, source: &Path, name: &str) -> Result<(), ArchiveError> {
        debug!(entry = name, source = %source.display(), "adding archive entry");
        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(source)?.permissions().mode();
            self.options.unix_permissions(mode & 0o777)
        };
        #[cfg(not(unix))]
        let options = self.options;
        self.zip.start_file(name, options)?;
        let mut f = File::open(source)?;
        io::copy(&mut f, &mut self.zip)?;
        self.entries += 1;
        Ok(())
    }

    /// Add an in-memory entry
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        debug!(entry = name, len = bytes.len(), "adding archive entry");
        self.zip.start_file(name, self.options)?;
        io::Write::write_all(&mut self.zip, bytes)?;
        self.entries += 1;
        Ok(())
    }

    /// Mirror every file below `source_dir` under `prefix`.
    ///
    /// Files are added in file-name order so repeated runs produce the same
    /// entry list.
    ///
    /// # Errors
    /// Returns an error if the walk or any entry fails
    pub fn add_dir_tree(&mut self, source_dir: &Path, prefix: &str) -> Result<(), ArchiveError> {
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let relative = relative_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let name = if prefix.is_empty() {
                relative
            } else {
                format!("{}/{relative}", prefix.trim_end_matches('/'))
            };

            self.add_file(entry.path(), &name)?;
        }
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Write the central directory and close the archive
    ///
    /// # Errors
    /// Returns an error if finalizing fails
    pub fn finish(mut self) -> Result<PathBuf, ArchiveError> {
        self.zip.finish()?;
        Ok(self.path)
    }
}

/// Names of every entry in the archive, in stored order
///
/// # Errors
/// Returns an error if the archive cannot be opened
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index_raw(i)?.name().to_string());
    }
    Ok(names)
}

/// Read a single entry as UTF-8 text
///
/// # Errors
/// Returns an error if the entry is missing or not valid text
pub fn read_entry_to_string(archive_path: &Path, name: &str) -> Result<String, ArchiveError> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry(name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Extract every entry of `archive_path` into `dest`.
///
/// With [`LongPathMode::Extended`], each target path is rewritten to its
/// extended-length form before the entry is written. Entries whose names
/// would land outside `dest` are rejected.
///
/// # Errors
/// Returns an error on unsafe entry names or any I/O failure
pub fn extract(
    archive_path: &Path,
    dest: &Path,
    mode: LongPathMode,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let relative = file
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ArchiveError::UnsafeEntry(file.name().to_string()))?;
        let target = mode.apply(&dest.join(&relative))?;

        if file.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut file, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(perm) = file.unix_mode().map(|m| m & 0o777).filter(|m| *m != 0) {
                fs::set_permissions(&target, fs::Permissions::from_mode(perm))?;
            }
        }

        debug!(entry = file.name(), target = %target.display(), "extracted");
        extracted.push(target);
    }

    Ok(extracted)
}
