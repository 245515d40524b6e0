//! `list` and `extract` subcommands

use addon_core::archive::{self, list_entries};
use addon_core::manifest::AddonManifest;
use addon_core::LongPathMode;
use anyhow::{Context, Result};
use std::path::Path;

pub fn list(archive_path: &Path) -> Result<()> {
    let entries = list_entries(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;

    if let Ok(manifest) = AddonManifest::from_archive(archive_path) {
        println!("Addon: {} v{}", manifest.addon_name, manifest.addon_version);
    }

    println!("Entries ({}):", entries.len());
    for entry in entries {
        println!("  {entry}");
    }
    Ok(())
}

pub fn extract(archive_path: &Path, dest: &Path) -> Result<()> {
    let mode = LongPathMode::detect();
    let extracted = archive::extract(archive_path, dest, mode)
        .with_context(|| format!("Failed to extract {}", archive_path.display()))?;

    println!("Extracted {} files to {}", extracted.len(), dest.display());
    Ok(())
}
