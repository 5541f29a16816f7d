//! On-disk layout for one package under `packages/<name>/`.

use std::path::{Path, PathBuf};

/// Computes the filesystem paths a [`crate::PackageHandler`] operates on for
/// a single package, following the `packages/<name>/<name>[.bk]` layout from
/// spec §6.
#[derive(Debug, Clone)]
pub struct PackageLayout {
    dir: PathBuf,
    name: String,
}

impl PackageLayout {
    /// Build the layout for `name` rooted at `packages_dir`.
    pub fn new(packages_dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            dir: packages_dir.as_ref().join(name),
            name: name.to_string(),
        }
    }

    /// The package's own directory, `packages/<name>/`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The installed artifact, `packages/<name>/<name>`.
    pub fn installed_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// The known-good backup copy, `packages/<name>/<name>.bk`.
    pub fn backup_path(&self) -> PathBuf {
        orchestration_tools::backup_path(self.installed_path())
    }

    /// A marker file recording the checksum of the last successful install,
    /// used by [`crate::PackageHandler::should_install`] to skip no-op
    /// reinstalls.
    pub fn checksum_marker_path(&self) -> PathBuf {
        self.dir.join(format!("{}.checksum", self.name))
    }

    /// Path to an optional lifecycle script (`pre_install.sh`,
    /// `install.sh`, `post_install.sh`, `uninstall.sh`). A missing script is
    /// not an error — the stage is treated as a no-op success.
    pub fn script_path(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.sh"))
    }
}
