//! Hybrid backend: the fog is used for manifest/software updates, but
//! policy is generated locally from a declarative source-of-truth file. A
//! watcher built on `notify` (already a teacher dependency) raises an
//! in-process [`ApplyPolicy`] event whenever that file changes, rather than
//! hand-rolling `inotify` bindings.

use crate::backend::CheckUpdateBackend;
use crate::error::Error;
use crate::fog::FogBackend;
use crate::model::{ArtifactUpdate, CheckUpdateRequest, CheckUpdateResponse};
use crate::Result;
use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use orchestration_tools::SELECTED_CHECKSUM_TYPE;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// Event raised by the declarative-policy watcher: "re-derive policy from
/// the source-of-truth file and apply it".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyPolicy;

/// Manifest/software go through the fog; policy is generated from a local
/// declarative file, watched for changes.
pub struct HybridBackend {
    fog: FogBackend,
    declarative_policy_file: PathBuf,
    last_policy_checksum: RwLock<Option<String>>,
}

impl HybridBackend {
    /// Build a Hybrid backend delegating manifest/software checks to `fog`
    /// and deriving policy from `declarative_policy_file`.
    pub fn new(fog: FogBackend, declarative_policy_file: impl Into<PathBuf>) -> Self {
        Self {
            fog,
            declarative_policy_file: declarative_policy_file.into(),
            last_policy_checksum: RwLock::new(None),
        }
    }

    fn check_declarative_policy(&self) -> Result<Option<ArtifactUpdate>> {
        if !orchestration_tools::non_empty_file(&self.declarative_policy_file) {
            return Ok(None);
        }
        let checksum = orchestration_tools::calculate_checksum(
            SELECTED_CHECKSUM_TYPE,
            &self.declarative_policy_file,
        )?;

        let changed = self.last_policy_checksum.read().expect("lock poisoned").as_deref()
            != Some(checksum.as_str());
        if !changed {
            return Ok(None);
        }

        Ok(Some(ArtifactUpdate {
            checksum,
            download_path: self.declarative_policy_file.display().to_string(),
            version: None,
        }))
    }
}

#[async_trait]
impl CheckUpdateBackend for HybridBackend {
    async fn check_update(&self, request: &CheckUpdateRequest) -> Result<CheckUpdateResponse> {
        let mut declarative_request = request.clone_without_policy();
        declarative_request.declarative_policy = true;
        let mut response = self.fog.check_update(&declarative_request).await?;
        response.policy = self.check_declarative_policy()?;
        Ok(response)
    }

    async fn fetch(&self, download_path: &str, checksum: &str) -> Result<PathBuf> {
        let path = Path::new(download_path);
        if path == self.declarative_policy_file {
            let actual = orchestration_tools::calculate_checksum(SELECTED_CHECKSUM_TYPE, path)?;
            if actual != checksum {
                return Err(downloader::Error::ChecksumMismatch {
                    resource: download_path.to_string(),
                    expected: checksum.to_string(),
                    actual,
                }
                .into());
            }
            *self.last_policy_checksum.write().expect("lock poisoned") = Some(actual);
            return Ok(path.to_path_buf());
        }
        self.fog.fetch(download_path, checksum).await
    }
}

impl CheckUpdateRequest {
    fn clone_without_policy(&self) -> Self {
        Self {
            policy: None,
            ..self.clone()
        }
    }
}

/// Watch `declarative_policy_file` for writes, sending [`ApplyPolicy`] on
/// `sender` whenever it changes. The returned watcher must be kept alive
/// for the duration of the watch (dropping it stops delivery).
pub fn watch_declarative_policy(
    declarative_policy_file: impl AsRef<Path>,
    sender: async_channel::Sender<ApplyPolicy>,
) -> Result<RecommendedWatcher> {
    let path = declarative_policy_file.as_ref().to_path_buf();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        match event {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                if sender.try_send(ApplyPolicy).is_err() {
                    warn!(path = %path.display(), "apply-policy channel full or closed, dropping event");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "declarative policy watch error"),
        }
    })?;
    watcher.watch(declarative_policy_file.as_ref(), RecursiveMode::NonRecursive)?;
    info!(path = %declarative_policy_file.as_ref().display(), "watching declarative policy file");
    Ok(watcher)
}
