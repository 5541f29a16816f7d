//! On-disk locations the manifest controller reads and writes.

use std::path::PathBuf;

/// The extension appended to the manifest file while a self-update is in
/// flight: the live file becomes `<manifest>.temp` until the new binary
/// proves itself with `post_install`.
pub const SELF_UPDATE_TEMP_EXT: &str = "temp";

/// Paths the controller owns. All are read/written through
/// `orchestration-tools`'s atomic-replace primitives.
#[derive(Debug, Clone)]
pub struct ManifestPaths {
    /// The live manifest file, e.g. `manifest.json`.
    pub manifest_file: PathBuf,
    /// The corrupted-package map, e.g. `corrupted_packages.json`.
    pub corrupted_file: PathBuf,
    /// The ignore-list text file, e.g. `ignore-packages.txt`.
    pub ignore_list_file: PathBuf,
    /// The `packages/` root [`package_handler::PackageHandler`] operates
    /// under.
    pub packages_dir: PathBuf,
}

impl ManifestPaths {
    /// The temp file a self-update writes its new manifest to, named
    /// `<manifest_file>.temp`.
    pub fn self_update_temp_file(&self) -> PathBuf {
        let mut name = self
            .manifest_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push('.');
        name.push_str(SELF_UPDATE_TEMP_EXT);
        self.manifest_file.with_file_name(name)
    }
}
