//! `build` subcommand

use addon_core::{
    build_package, read_addon_version, ExcludedSubtree, PackageOptions, RuleSet, StagingLayout,
    StagingState,
};
use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args)]
pub struct BuildArgs {
    /// Name of the addon
    #[arg(long = "name")]
    addon_name: String,

    /// Path to package with addon client code
    #[arg(long = "source-client-dir")]
    client_dir: Option<PathBuf>,

    /// Path to package with addon server code
    #[arg(long = "source-server-dir")]
    server_dir: Option<PathBuf>,

    /// Path to addon service code
    #[arg(long = "source-service-dir")]
    service_dir: Option<PathBuf>,

    /// Path to addon dependency descriptor (pyproject.toml)
    #[arg(long = "source-pyproject")]
    dependency_descriptor: Option<PathBuf>,

    /// Version file (defaults to version.py in the client directory)
    #[arg(long)]
    version_file: Option<PathBuf>,

    /// Directory where the package will be created
    #[arg(short, long = "output", default_value = "packages")]
    output_dir: PathBuf,

    /// Skip zipping and create only the staging folder structure
    #[arg(long)]
    skip_zip: bool,

    /// Keep the staging folder structure after the package is created
    #[arg(long = "keep-sources")]
    keep_sources: bool,

    /// Clear the output directory before package creation
    #[arg(short, long)]
    clear_output_dir: bool,

    /// Exclude a client subfolder, e.g. vendor/pkgA (repeatable)
    #[arg(short = 'x', long = "exclude-client-subfolders", value_name = "SUBFOLDER")]
    exclude_client_subfolders: Vec<String>,

    /// Regex for file names to skip; replaces the defaults (repeatable)
    #[arg(long = "ignore-file", value_name = "REGEX")]
    ignore_file_patterns: Vec<String>,

    /// Regex for directory names to skip; replaces the defaults (repeatable)
    #[arg(long = "ignore-dir", value_name = "REGEX")]
    ignore_dir_patterns: Vec<String>,

    /// Rebuild over a completed staging tree without asking
    #[arg(short, long)]
    force: bool,
}

impl BuildArgs {
    fn to_options(&self) -> Result<PackageOptions> {
        let mut options = PackageOptions::new(&self.addon_name, &self.output_dir)
            .with_final_zip(!self.skip_zip)
            .with_keep_staging(self.keep_sources)
            .with_clear_output_dir(self.clear_output_dir)
            .with_overwrite_complete(self.force)
            .with_excluded_client_subtrees(
                self.exclude_client_subfolders
                    .iter()
                    .map(|s| ExcludedSubtree::parse(s))
                    .collect(),
            );

        if let Some(dir) = &self.client_dir {
            options = options.with_client_dir(dir);
        }
        if let Some(dir) = &self.server_dir {
            options = options.with_server_dir(dir);
        }
        if let Some(dir) = &self.service_dir {
            options = options.with_service_dir(dir);
        }
        if let Some(path) = &self.dependency_descriptor {
            options = options.with_dependency_descriptor(path);
        }
        if let Some(path) = &self.version_file {
            options = options.with_version_file(path);
        }
        if !self.ignore_file_patterns.is_empty() {
            options = options.with_file_rules(RuleSet::from_patterns(&self.ignore_file_patterns)?);
        }
        if !self.ignore_dir_patterns.is_empty() {
            options = options.with_dir_rules(RuleSet::from_patterns(&self.ignore_dir_patterns)?);
        }

        Ok(options)
    }
}

/// Ask before replacing a staging tree that holds a finished build
fn confirm_overwrite(options: &PackageOptions) -> Result<bool> {
    let Some(version_file) = options.version_file() else {
        return Ok(true);
    };
    // Missing or bad version files are reported by the build itself
    let Ok(version) = read_addon_version(&version_file) else {
        return Ok(true);
    };

    let layout = StagingLayout::new(options.output_dir(), options.addon_name(), &version);
    if layout.state() != StagingState::Complete {
        return Ok(true);
    }

    print!(
        "Staging tree {} holds a completed build. Rebuild it? [y/N] ",
        layout.root().display()
    );
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let mut options = args.to_options()?;

    if !args.force && !args.clear_output_dir {
        if !confirm_overwrite(&options)? {
            println!("Cancelled.");
            return Ok(());
        }
        options = options.with_overwrite_complete(true);
    }

    let outcome = build_package(&options)
        .with_context(|| format!("Failed to build addon '{}'", args.addon_name))?;

    println!(
        "Addon Package finished: '{}' - {}",
        args.addon_name,
        outcome.path().display()
    );
    Ok(())
}
