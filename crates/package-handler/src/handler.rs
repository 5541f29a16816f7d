//! Pre-install / install / post-install / uninstall / update-saved-package
//! shell sequences for a single package.

use crate::error::{Error, Result};
use crate::layout::PackageLayout;
use command_executor::{backends::LocalLauncher, launcher::Launcher, target::Target, Command};
use manifest::Package;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-invocation timeout for a package lifecycle script, mirroring
/// the shell-command timeout budget used across the agent (spec §5).
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_millis(200);

/// Runs the scoped shell sequences that install, verify, and remove one
/// package on disk, grounded on
/// `service_orchestration::health::HealthChecker`'s "run a command, turn
/// exit code into a typed outcome" pattern.
pub struct PackageHandler {
    launcher: LocalLauncher,
    packages_dir: PathBuf,
    stage_timeout: Duration,
}

impl PackageHandler {
    /// Create a handler rooted at `packages_dir` (spec's `packages/` root).
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher: LocalLauncher,
            packages_dir: packages_dir.into(),
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Override the per-stage shell timeout (primarily for tests).
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    fn layout(&self, name: &str) -> PackageLayout {
        PackageLayout::new(&self.packages_dir, name)
    }

    /// Cheap predicate: skip a no-op install when the on-disk checksum
    /// marker already matches the package's declared checksum.
    pub fn should_install(&self, pkg: &Package) -> bool {
        let marker = self.layout(&pkg.name).checksum_marker_path();
        match orchestration_tools::read_file(&marker) {
            Ok(existing) => existing.trim() != pkg.checksum,
            Err(_) => true,
        }
    }

    /// Integrity/sanity probe run before installing. A failure aborts the
    /// install without any on-disk change.
    pub async fn pre_install(&self, pkg: &Package, downloaded_file: &Path) -> Result<()> {
        self.run_stage(pkg, "pre_install", &[downloaded_file]).await
    }

    /// The destructive install step. In `restore_mode`, the package's `.bk`
    /// backup is used instead of the freshly downloaded file.
    pub async fn install(
        &self,
        pkg: &Package,
        downloaded_file: &Path,
        restore_mode: bool,
    ) -> Result<()> {
        let layout = self.layout(&pkg.name);
        let source = if restore_mode {
            layout.backup_path()
        } else {
            downloaded_file.to_path_buf()
        };
        self.run_stage(pkg, "install", &[&source]).await?;
        orchestration_tools::create_directory(layout.dir())?;
        orchestration_tools::copy_file(&source, layout.installed_path())?;
        Ok(())
    }

    /// Health probe run after install.
    pub async fn post_install(&self, pkg: &Package) -> Result<()> {
        self.run_stage(pkg, "post_install", &[]).await
    }

    /// Remove an installed package and run its cleanup script.
    pub async fn uninstall(&self, pkg: &Package) -> Result<()> {
        self.run_stage(pkg, "uninstall", &[]).await?;
        let layout = self.layout(&pkg.name);
        orchestration_tools::remove_directory(layout.dir(), true)?;
        Ok(())
    }

    /// Copy the freshly installed file over the backup slot and record its
    /// checksum marker, so future `restore_mode` installs and
    /// `should_install` checks see the newly known-good artifact.
    pub fn update_saved_package(&self, pkg: &Package) -> Result<()> {
        let layout = self.layout(&pkg.name);
        orchestration_tools::copy_file(layout.installed_path(), layout.backup_path())?;
        orchestration_tools::write_file(&pkg.checksum, layout.checksum_marker_path(), false)?;
        Ok(())
    }

    async fn run_stage(&self, pkg: &Package, stage: &'static str, args: &[&Path]) -> Result<()> {
        let layout = self.layout(&pkg.name);
        let script = layout.script_path(stage);
        if !orchestration_tools::file_exists(&script) {
            debug!(package = %pkg.name, stage, "no script present, treating as success");
            return Ok(());
        }

        let mut cmd = Command::new(&script);
        for arg in args {
            cmd.arg(arg);
        }

        let run = self.launcher.execute(&Target::Command, cmd);
        let timeout = async_io::Timer::after(self.stage_timeout);

        let outcome = futures_lite::future::or(
            async { Ok(run.await) },
            async {
                timeout.await;
                Err(())
            },
        )
        .await;

        match outcome {
            Ok(Ok(status)) if status.success() => {
                info!(package = %pkg.name, stage, "stage succeeded");
                Ok(())
            }
            Ok(Ok(status)) => {
                let reason = format!("exit code {:?}", status.code);
                warn!(package = %pkg.name, stage, reason = %reason, "stage failed");
                Err(Error::StageFailed {
                    stage,
                    package: pkg.name.clone(),
                    reason,
                })
            }
            Ok(Err(e)) => Err(Error::Executor(e)),
            Err(()) => {
                warn!(package = %pkg.name, stage, "stage timed out");
                Err(Error::StageFailed {
                    stage,
                    package: pkg.name.clone(),
                    reason: "timed out".to_string(),
                })
            }
        }
    }
}

/// Verify a downloaded artifact's checksum matches the package's declared
/// checksum, used by callers before invoking [`PackageHandler::install`].
pub fn verify_checksum(pkg: &Package, downloaded_file: &Path) -> Result<()> {
    let actual = orchestration_tools::calculate_checksum(pkg.checksum_type, downloaded_file)?;
    if actual != pkg.checksum {
        return Err(Error::StageFailed {
            stage: "checksum",
            package: pkg.name.clone(),
            reason: format!("expected {}, got {}", pkg.checksum, actual),
        });
    }
    Ok(())
}
