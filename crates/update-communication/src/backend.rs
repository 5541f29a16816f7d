//! The `CheckUpdateBackend` trait all three backends implement.

use crate::model::{CheckUpdateRequest, CheckUpdateResponse};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A backend capable of checking for, and fetching, updates to the four
/// top-level artifacts and any active virtual variants.
///
/// Mode selection happens once at process init (spec §9: a tagged variant,
/// not a trait object swapped at runtime) — switching backends is a
/// restart-level operation.
#[async_trait]
pub trait CheckUpdateBackend: Send + Sync {
    /// Send `request`, returning the set of changed artifacts.
    async fn check_update(&self, request: &CheckUpdateRequest) -> Result<CheckUpdateResponse>;

    /// Fetch the artifact described by `download_path`, verifying it
    /// against `checksum`, and return its local path.
    async fn fetch(&self, download_path: &str, checksum: &str) -> Result<PathBuf>;
}
