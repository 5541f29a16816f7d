//! Pre-install / install / post-install / uninstall / update-saved-package
//! shell sequences for one package on disk.
//!
//! Each operation is a scoped shell invocation against the package's own
//! directory under `packages/<name>/`; none mutates on-disk state beyond
//! what the underlying script does, except [`PackageHandler::install`] and
//! [`PackageHandler::update_saved_package`], which additionally manage the
//! `<name>`/`<name>.bk` artifact copies spec §6 describes.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod error;
mod handler;
mod layout;

pub use error::{Error, Result};
pub use handler::{verify_checksum, PackageHandler, DEFAULT_STAGE_TIMEOUT};
pub use layout::PackageLayout;

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::{Package, PackageType};
    use orchestration_tools::ChecksumType;
    use std::time::Duration;
    use tempfile::tempdir;

    fn pkg(name: &str, checksum: &str) -> Package {
        Package {
            name: name.to_string(),
            version: "1.0".to_string(),
            download_path: "/tmp/x".to_string(),
            relative_path: None,
            checksum_type: ChecksumType::Sha256,
            checksum: checksum.to_string(),
            package_type: PackageType::Service,
            require: vec![],
            installable: Ok(()),
        }
    }

    #[smol_potat::test]
    async fn missing_scripts_are_treated_as_success() {
        let packages_dir = tempdir().unwrap();
        let handler = PackageHandler::new(packages_dir.path())
            .with_stage_timeout(Duration::from_millis(50));
        let p = pkg("svc", "h1");

        let download_dir = tempdir().unwrap();
        let file = download_dir.path().join("svc-bin");
        std::fs::write(&file, b"binary").unwrap();

        handler.pre_install(&p, &file).await.unwrap();
        handler.install(&p, &file, false).await.unwrap();
        handler.post_install(&p).await.unwrap();

        let layout = PackageLayout::new(packages_dir.path(), "svc");
        assert!(layout.installed_path().exists());
    }

    #[test]
    fn should_install_is_true_until_marker_matches() {
        let packages_dir = tempdir().unwrap();
        let handler = PackageHandler::new(packages_dir.path());
        let p = pkg("svc", "h1");
        assert!(handler.should_install(&p));

        let layout = PackageLayout::new(packages_dir.path(), &p.name);
        orchestration_tools::create_directory(layout.dir()).unwrap();
        orchestration_tools::write_file("binary", layout.installed_path(), false).unwrap();
        handler.update_saved_package(&p).unwrap();

        assert!(!handler.should_install(&p));
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bin");
        std::fs::write(&file, b"content").unwrap();
        let p = pkg("svc", "not-the-real-checksum");
        assert!(verify_checksum(&p, &file).is_err());
    }
}
