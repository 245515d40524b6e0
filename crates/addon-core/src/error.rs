//! Error types for addon packaging

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::collect::CollectError;
use crate::filter::FilterError;
use crate::util::PathError;
use crate::version::VersionError;

/// Result type for packaging operations
pub type PackageResult<T> = Result<T, PackageError>;

/// Errors that can occur while building a package
#[derive(Error, Debug)]
pub enum PackageError {
    /// Invalid addon name
    #[error("Invalid addon name: {0}")]
    InvalidName(#[from] PathError),

    /// No version file configured or found
    #[error("No version file: provide a client directory or an explicit version file")]
    NoVersionFile,

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// A finished staging tree would be overwritten
    #[error("Staging tree {path} holds a completed build; allow overwrite to rebuild it")]
    StagingComplete { path: PathBuf },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
