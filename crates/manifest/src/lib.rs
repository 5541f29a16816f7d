//! Typed package record and the manifest diff/queue algebra.
//!
//! `Package` equality compares only `(checksum_type, checksum)`; this is how
//! the diff layer detects "same artifact under a possibly different
//! filename". [`filter_untracked_packages`], [`filter_corrupted_packages`],
//! and [`build_installation_queue`] implement spec §4.B's three-snapshot
//! algebra (`current`, `new`, `corrupted`).

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod error;
mod ignore_list;
mod manifest;
mod package;
mod queue;

pub use error::{Error, Result};
pub use ignore_list::{IgnoreList, IGNORE_ALL, IGNORE_NONE};
pub use manifest::{filter_corrupted_packages, filter_untracked_packages, CorruptedPackages, Manifest};
pub use package::{Package, PackageType, ORCHESTRATION_SERVICE_NAME};
pub use queue::build_installation_queue;

/// Load a [`Manifest`] from a JSON document.
pub fn load_manifest(path: impl AsRef<std::path::Path>) -> Result<Manifest> {
    Ok(orchestration_tools::load_map_from_json(path)?)
}

/// Persist a [`Manifest`] as a JSON document via the atomic-replace
/// invariant.
pub fn save_manifest(manifest: &Manifest, path: impl AsRef<std::path::Path>) -> Result<()> {
    Ok(orchestration_tools::map_to_json_file(manifest, path)?)
}
