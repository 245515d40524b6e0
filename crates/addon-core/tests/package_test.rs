//! Package assembly tests
//!
//! Builds addon packages from temporary source trees and inspects the
//! staging tree and archives left on disk.

use addon_core::archive::list_entries;
use addon_core::manifest::AddonManifest;
use addon_core::version::AddonVersion;
use addon_core::{
    build_package, ExcludedSubtree, PackageError, PackageOptions, PackageOutcome, StagingLayout,
    StagingState,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("Failed to create dirs");
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn client_dir(&self) -> PathBuf {
        self.write("core/version.py", "__version__ = \"1.2.0\"\n");
        self.root.join("core")
    }

    fn output_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    fn layout(&self) -> StagingLayout {
        let version = AddonVersion::new("1.2.0").expect("valid version");
        StagingLayout::new(&self.output_dir(), "studiotoolkit", &version)
    }
}

fn entry_set(archive: &Path) -> BTreeSet<String> {
    list_entries(archive)
        .expect("Failed to list archive")
        .into_iter()
        .collect()
}

fn dir_listing(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect()
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// =============================================================================
// Distributable Archive
// =============================================================================

#[test]
fn test_final_archive_name_and_manifest() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir());

    let outcome = build_package(&options).expect("Build failed");
    let archive = fx.output_dir().join("studiotoolkit-1.2.0.zip");
    assert_eq!(outcome, PackageOutcome::Archive(archive.clone()));
    assert!(archive.is_file());

    let manifest = AddonManifest::from_archive(&archive).expect("Failed to read manifest");
    assert_eq!(manifest.addon_name, "studiotoolkit");
    assert_eq!(manifest.addon_version, "1.2.0");
}

#[test]
fn test_final_archive_mirrors_staging_tree() {
    let fx = Fixture::new();
    fx.write("server/__init__.py", "class Addon: pass\n");
    fx.write("server/settings/main.py", "SETTINGS = {}\n");
    fx.write("core/pyproject.toml", "[project]\nname = \"core\"\n");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_server_dir(fx.root.join("server"))
        .with_dependency_descriptor(fx.root.join("core/pyproject.toml"));

    let outcome = build_package(&options).expect("Build failed");

    assert_eq!(
        entry_set(outcome.path()),
        names(&[
            "manifest.json",
            "addon/version.py",
            "addon/__init__.py",
            "addon/settings/main.py",
            "addon/private/pyproject.toml",
            "addon/private/client.zip",
        ])
    );
    let manifests = list_entries(outcome.path())
        .expect("Failed to list")
        .into_iter()
        .filter(|e| e == "manifest.json")
        .count();
    assert_eq!(manifests, 1);
}

// =============================================================================
// Client Archive
// =============================================================================

#[test]
fn test_client_archive_skips_hidden_files() {
    let fx = Fixture::new();
    fx.write("core/foo.txt", "foo");
    fx.write("core/.secret", "hidden");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_final_zip(false);

    build_package(&options).expect("Build failed");

    assert_eq!(
        entry_set(&fx.layout().client_archive()),
        names(&["core/foo.txt", "core/version.py"])
    );
}

#[test]
fn test_client_archive_honors_excluded_subtrees() {
    let fx = Fixture::new();
    fx.write("core/vendor/pkgA/a.py", "a");
    fx.write("core/vendor/pkgA/sub/b.py", "b");
    fx.write("core/vendor/pkgB/c.py", "c");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_final_zip(false)
        .with_excluded_client_subtrees(vec![ExcludedSubtree::new(["vendor", "pkgA"])]);

    build_package(&options).expect("Build failed");

    assert_eq!(
        entry_set(&fx.layout().client_archive()),
        names(&["core/version.py", "core/vendor/pkgB/c.py"])
    );
}

// =============================================================================
// Staging Lifecycle
// =============================================================================

#[test]
fn test_staging_removed_without_keep() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir());

    build_package(&options).expect("Build failed");

    assert!(!fx.output_dir().join("studiotoolkit").exists());
    assert!(fx.output_dir().join("studiotoolkit-1.2.0.zip").exists());
}

#[test]
fn test_staging_kept_matches_archive() {
    let fx = Fixture::new();
    fx.write("server/__init__.py", "x");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_server_dir(fx.root.join("server"))
        .with_keep_staging(true);

    let outcome = build_package(&options).expect("Build failed");

    let layout = fx.layout();
    assert_eq!(layout.state(), StagingState::Complete);
    let staged: BTreeSet<String> = names(&["__init__.py", "version.py", "private"]);
    assert_eq!(dir_listing(&layout.root()), staged);

    let archived: BTreeSet<String> = entry_set(outcome.path())
        .into_iter()
        .filter_map(|e| e.strip_prefix("addon/").map(str::to_string))
        .collect();
    assert_eq!(
        archived,
        names(&["__init__.py", "version.py", "private/client.zip"])
    );
}

#[test]
fn test_without_server_dir_only_version_and_private() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_final_zip(false);

    let outcome = build_package(&options).expect("Build failed");

    assert_eq!(outcome, PackageOutcome::Staging(fx.layout().root()));
    assert_eq!(dir_listing(&fx.layout().root()), names(&["version.py", "private"]));
}

#[test]
fn test_service_dir_copies_top_level_files_only() {
    let fx = Fixture::new();
    fx.write("service/main.py", "run()");
    fx.write("service/nested/ignored.py", "x");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_service_dir(fx.root.join("service"))
        .with_final_zip(false);

    build_package(&options).expect("Build failed");

    assert_eq!(
        dir_listing(&fx.layout().root()),
        names(&["main.py", "version.py", "private"])
    );
}

#[test]
fn test_missing_optional_paths_are_skipped() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_server_dir(fx.root.join("no-server"))
        .with_service_dir(fx.root.join("no-service"))
        .with_dependency_descriptor(fx.root.join("no-pyproject.toml"))
        .with_final_zip(false);

    build_package(&options).expect("Build failed");

    assert_eq!(dir_listing(&fx.layout().private_dir()), names(&["client.zip"]));
}

#[test]
fn test_rebuild_over_complete_requires_overwrite() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_keep_staging(true);

    build_package(&options).expect("First build failed");
    let err = build_package(&options).expect_err("Second build should be refused");
    assert!(matches!(err, PackageError::StagingComplete { .. }));

    build_package(&options.clone().with_overwrite_complete(true))
        .expect("Overwrite build failed");
}

#[test]
fn test_rebuild_is_idempotent() {
    let fx = Fixture::new();
    fx.write("core/tools/a.py", "a");
    fx.write("server/__init__.py", "x");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_server_dir(fx.root.join("server"))
        .with_keep_staging(true)
        .with_overwrite_complete(true);

    build_package(&options).expect("First build failed");
    let first_client = entry_set(&fx.layout().client_archive());
    let first_tree = dir_listing(&fx.layout().root());

    build_package(&options).expect("Second build failed");
    assert_eq!(entry_set(&fx.layout().client_archive()), first_client);
    assert_eq!(dir_listing(&fx.layout().root()), first_tree);
}

#[test]
fn test_rebuild_discards_stale_staging_files() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_final_zip(false)
        .with_overwrite_complete(true);

    build_package(&options).expect("First build failed");
    fs::write(fx.layout().root().join("stale.txt"), "old").expect("Failed to write");
    build_package(&options).expect("Second build failed");

    assert!(!fx.layout().root().join("stale.txt").exists());
}

#[test]
fn test_clear_output_dir_removes_other_artifacts() {
    let fx = Fixture::new();
    fx.write("packages/old-0.1.0.zip", "old");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_clear_output_dir(true);

    build_package(&options).expect("Build failed");

    assert_eq!(dir_listing(&fx.output_dir()), names(&["studiotoolkit-1.2.0.zip"]));
}

// =============================================================================
// Version Errors
// =============================================================================

#[test]
fn test_missing_version_file_is_fatal() {
    let fx = Fixture::new();
    fx.write("core/foo.txt", "foo");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.root.join("core"));

    let err = build_package(&options).expect_err("Build should fail");
    assert!(matches!(err, PackageError::Version(_)));
    assert!(!fx.output_dir().join("studiotoolkit-1.2.0.zip").exists());
}

#[test]
fn test_unparsable_version_file_is_fatal() {
    let fx = Fixture::new();
    fx.write("core/version.py", "import os\nVERSION = compute()\n");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.root.join("core"));

    let err = build_package(&options).expect_err("Build should fail");
    assert!(err.to_string().contains("No version assignment found"));
}

#[test]
fn test_no_client_and_no_version_file() {
    let fx = Fixture::new();
    let options = PackageOptions::new("studiotoolkit", fx.output_dir());

    let err = build_package(&options).expect_err("Build should fail");
    assert!(matches!(err, PackageError::NoVersionFile));
}

#[test]
fn test_explicit_version_file_without_client() {
    let fx = Fixture::new();
    let version_file = fx.write("VERSION", "0.9.1\n");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_version_file(version_file)
        .with_final_zip(false);

    let outcome = build_package(&options).expect("Build failed");

    let root = fx.output_dir().join("studiotoolkit").join("0.9.1");
    assert_eq!(outcome, PackageOutcome::Staging(root.clone()));
    assert_eq!(dir_listing(&root), names(&["VERSION", "private"]));
}

#[test]
fn test_invalid_addon_name_rejected() {
    let fx = Fixture::new();
    let options = PackageOptions::new("../escape", fx.output_dir())
        .with_client_dir(fx.client_dir());

    let err = build_package(&options).expect_err("Build should fail");
    assert!(matches!(err, PackageError::InvalidName(_)));
}

// =============================================================================
// Symlinked Sources
// =============================================================================

#[cfg(unix)]
#[test]
fn test_server_dir_follows_symlinked_directories() {
    let fx = Fixture::new();
    fx.write("shared/common.py", "shared = True");
    fx.write("server/settings/main.py", "x");
    std::os::unix::fs::symlink("../../shared", fx.root.join("server/settings/shared"))
        .expect("Failed to create symlink");
    let options = PackageOptions::new("studiotoolkit", fx.output_dir())
        .with_client_dir(fx.client_dir())
        .with_server_dir(fx.root.join("server"))
        .with_final_zip(false);

    build_package(&options).expect("Build failed");

    let staged = fx.layout().root().join("settings/shared");
    assert!(!fs::symlink_metadata(&staged).expect("staged").file_type().is_symlink());
    assert_eq!(
        fs::read_to_string(staged.join("common.py")).expect("Failed to read"),
        "shared = True"
    );
}
