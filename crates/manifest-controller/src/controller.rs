//! The ten-step manifest update algorithm (spec §4.H), grounded on
//! `manifest_controller.cc`'s stage ordering: `filterUntrackedPackages` →
//! uninstall → persist current → download → `buildInstallationQueue` →
//! install loop → persist manifest.

use crate::error::{Error, Result};
use crate::ignore_file::is_ignore_file;
use crate::paths::ManifestPaths;
use manifest::{
    build_installation_queue, filter_corrupted_packages, filter_untracked_packages, CorruptedPackages,
    IgnoreList, Manifest, Package, ORCHESTRATION_SERVICE_NAME,
};
use package_handler::PackageHandler;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use update_communication::CheckUpdateBackend;

/// The service name that, alongside [`ORCHESTRATION_SERVICE_NAME`], takes
/// over the running process when installed — the self-update edge case.
pub const WLP_STANDALONE_SERVICE_NAME: &str = "wlpStandalone";

fn is_self_replacing(name: &str) -> bool {
    name == ORCHESTRATION_SERVICE_NAME || name == WLP_STANDALONE_SERVICE_NAME
}

/// The result of one `apply_update` tick.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// The ignore-file fast path (or the NSaaS latch) short-circuited the
    /// tick: the manifest file was copied forward untouched.
    Ignored,
    /// Every install in the queue succeeded (or was intentionally skipped);
    /// the manifest file was replaced.
    Success,
    /// At least one install failed and was recorded in the corrupted list;
    /// the manifest file was left at its pre-tick content.
    PartialFailure,
    /// An install of the orchestrator's own service or `wlpStandalone`
    /// completed; those services take over the process and the caller must
    /// exit rather than continue the loop.
    SelfUpdate {
        /// Which service triggered the hand-off.
        service: String,
        /// Whether that install itself succeeded.
        succeeded: bool,
    },
}

/// Drives the ten-step update algorithm against one set of on-disk paths.
pub struct ManifestController {
    package_handler: PackageHandler,
    backend: Arc<dyn CheckUpdateBackend>,
    paths: ManifestPaths,
    ignore_packages_update: AtomicBool,
}

impl ManifestController {
    /// Build a controller installing packages under `paths.packages_dir`
    /// and fetching artifacts through `backend`.
    pub fn new(paths: ManifestPaths, backend: Arc<dyn CheckUpdateBackend>) -> Self {
        Self {
            package_handler: PackageHandler::new(paths.packages_dir.clone()),
            backend,
            paths,
            ignore_packages_update: AtomicBool::new(false),
        }
    }

    /// Whether the NSaaS ignore-all latch has been set by a previous tick.
    pub fn ignore_packages_update(&self) -> bool {
        self.ignore_packages_update.load(Ordering::SeqCst)
    }

    /// Apply the manifest document at `new_manifest_path`. `is_nsaas`
    /// reflects the `accessControl.isAwsNSaaS` profile setting, resolved by
    /// the caller.
    pub async fn apply_update(&self, new_manifest_path: &Path, is_nsaas: bool) -> Result<ApplyOutcome> {
        let raw = orchestration_tools::read_file(new_manifest_path)?;

        // Step 1 + the NSaaS short-circuit: once the latch is set, every
        // subsequent tick behaves as if it received the ignore-file.
        if self.ignore_packages_update() || is_ignore_file(&raw) {
            orchestration_tools::copy_file(new_manifest_path, &self.paths.manifest_file)?;
            return Ok(ApplyOutcome::Ignored);
        }

        // Step 2.
        let mut current: Manifest = manifest::load_manifest(&self.paths.manifest_file).unwrap_or_default();
        let mut new: Manifest = manifest::load_manifest(new_manifest_path)?;
        let mut corrupted: CorruptedPackages =
            orchestration_tools::load_map_from_json(&self.paths.corrupted_file).unwrap_or_default();

        filter_corrupted_packages(&mut new, &mut corrupted);

        // Step 3: ignore-list application.
        let ignore_list = self.load_ignore_list()?;
        for name in ignore_list.names() {
            match new.get(name) {
                Some(pkg) => {
                    current.insert(name.to_string(), pkg.clone());
                }
                None => {
                    current.remove(name);
                }
            }
        }
        if ignore_list.ignores_all() {
            orchestration_tools::copy_file(new_manifest_path, &self.paths.manifest_file)?;
            return Ok(ApplyOutcome::Ignored);
        }

        // Step 4.
        let to_uninstall = filter_untracked_packages(&current, &mut new);

        // Step 5.
        for (name, pkg) in &to_uninstall {
            if pkg.installable.is_ok() {
                if let Err(e) = self.package_handler.uninstall(pkg).await {
                    warn!(package = %name, error = %e, "uninstall failed, continuing");
                }
            }
            current.remove(name);
        }
        manifest::save_manifest(&current, &self.paths.manifest_file)?;

        // Step 6.
        let mut downloaded = std::collections::HashMap::with_capacity(new.len());
        for (name, pkg) in &new {
            let path = self
                .backend
                .fetch(&pkg.download_path, &pkg.checksum)
                .await
                .map_err(|source| Error::Download {
                    package: name.clone(),
                    source,
                })?;
            downloaded.insert(name.clone(), path);
        }

        // Step 7.
        let queue = build_installation_queue(&new)?;

        // Step 8.
        let mut any_install_failed = false;
        for name in &queue {
            let pkg = &new[name];

            if let Err(reason) = &pkg.installable {
                info!(package = %name, reason = %reason, "package marked non-installable, skipping");
                current.insert(name.clone(), pkg.clone());
                continue;
            }

            let install_result = self.install_one(pkg, &downloaded[name]).await;

            if is_self_replacing(name) {
                return Ok(ApplyOutcome::SelfUpdate {
                    service: name.clone(),
                    succeeded: install_result.is_ok(),
                });
            }

            match install_result {
                Ok(()) => {
                    current.insert(name.clone(), pkg.clone());
                }
                Err(e) => {
                    warn!(package = %name, error = %e, "install failed, recording as corrupted");
                    corrupted.insert(name.clone(), pkg.checksum.clone());
                    orchestration_tools::map_to_json_file(&corrupted, &self.paths.corrupted_file)?;
                    any_install_failed = true;
                }
            }
        }

        if any_install_failed {
            return Ok(ApplyOutcome::PartialFailure);
        }

        // Step 9.
        manifest::save_manifest(&current, &self.paths.manifest_file)?;

        // Step 10.
        if is_nsaas {
            orchestration_tools::write_file(
                &IgnoreList::all().to_text(),
                &self.paths.ignore_list_file,
                false,
            )?;
            self.ignore_packages_update.store(true, Ordering::SeqCst);
        }

        Ok(ApplyOutcome::Success)
    }

    async fn install_one(&self, pkg: &Package, downloaded_file: &Path) -> package_handler::Result<()> {
        self.package_handler.pre_install(pkg, downloaded_file).await?;
        self.package_handler.install(pkg, downloaded_file, false).await?;
        self.package_handler.post_install(pkg).await?;
        self.package_handler.update_saved_package(pkg)?;
        Ok(())
    }

    fn load_ignore_list(&self) -> Result<IgnoreList> {
        match orchestration_tools::read_file(&self.paths.ignore_list_file) {
            Ok(text) => Ok(IgnoreList::parse(&text)),
            Err(_) => Ok(IgnoreList::default()),
        }
    }

    /// Recover from a crash mid-self-update (spec's `loadAfterSelfUpdate`,
    /// called once during init). If `<manifest>.temp` exists, the previous
    /// process was mid-hand-off: run `post_install` on the new orchestrator
    /// binary and, on success, rename temp → live for both the manifest and
    /// the binary and refresh the saved-package backup. On failure the temp
    /// file is left for the watchdog's next attempt.
    pub async fn load_after_self_update(&self) -> Result<()> {
        let temp_manifest = self.paths.self_update_temp_file();
        if !orchestration_tools::non_empty_file(&temp_manifest) {
            return Ok(());
        }

        let new_manifest: Manifest = manifest::load_manifest(&temp_manifest)?;
        let Some(orchestration_pkg) = new_manifest.get(ORCHESTRATION_SERVICE_NAME) else {
            return Ok(());
        };

        match self.package_handler.post_install(orchestration_pkg).await {
            Ok(()) => {
                orchestration_tools::copy_file(&temp_manifest, &self.paths.manifest_file)?;
                orchestration_tools::remove_file(&temp_manifest)?;
                self.package_handler.update_saved_package(orchestration_pkg)?;
                info!("self-update verified, promoted temp manifest to live");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "post_install failed after self-update, leaving temp manifest for retry");
                Ok(())
            }
        }
    }
}
