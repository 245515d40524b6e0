//! Addon Core - packaging engine for pipeline addons
//!
//! This crate collects client, server and service sources into a staging
//! tree and assembles the versioned distributable archive consumed by the
//! platform's addon loader.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod archive;
pub mod collect;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod package;
pub mod staging;
pub mod util;
pub mod version;

pub use archive::{ArchiveWriter, LongPathMode};
pub use collect::{collect_files, DiscoveredFile, ExcludedSubtree};
pub use error::{PackageError, PackageResult};
pub use filter::{FilterRule, RuleSet};
pub use manifest::AddonManifest;
pub use package::{build_package, PackageOptions, PackageOutcome};
pub use staging::{StagingLayout, StagingState};
pub use version::{read_addon_version, AddonVersion};
