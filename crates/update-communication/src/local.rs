//! Offline backend: reads artifacts from a configured on-disk staging
//! directory. "Change detected" means the staged file's checksum differs
//! from the last one this process consumed.

use crate::backend::CheckUpdateBackend;
use crate::error::Error;
use crate::model::{ArtifactUpdate, CheckUpdateRequest, CheckUpdateResponse};
use crate::Result;
use async_trait::async_trait;
use orchestration_tools::SELECTED_CHECKSUM_TYPE;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const TOP_LEVEL_ARTIFACTS: [&str; 4] = ["manifest", "policy", "settings", "data"];

/// Reads staged artifacts from `staging_dir`, tracking the last checksum
/// consumed per artifact so repeated polls only report genuine changes.
pub struct LocalBackend {
    staging_dir: PathBuf,
    last_consumed: RwLock<HashMap<String, String>>,
}

impl LocalBackend {
    /// Build a Local backend reading artifacts from `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            last_consumed: RwLock::new(HashMap::new()),
        }
    }

    fn staged_path(&self, name: &str) -> PathBuf {
        self.staging_dir.join(format!("{name}.json"))
    }

    fn check_one(&self, key: &str, path: &Path) -> Result<Option<ArtifactUpdate>> {
        if !orchestration_tools::non_empty_file(path) {
            return Ok(None);
        }
        let checksum = orchestration_tools::calculate_checksum(SELECTED_CHECKSUM_TYPE, path)?;

        let changed = {
            let last = self.last_consumed.read().expect("lock poisoned");
            last.get(key) != Some(&checksum)
        };

        if !changed {
            return Ok(None);
        }

        Ok(Some(ArtifactUpdate {
            checksum,
            download_path: path.display().to_string(),
            version: None,
        }))
    }

    fn mark_consumed(&self, key: &str, checksum: &str) {
        self.last_consumed
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), checksum.to_string());
    }
}

#[async_trait]
impl CheckUpdateBackend for LocalBackend {
    async fn check_update(&self, request: &CheckUpdateRequest) -> Result<CheckUpdateResponse> {
        let mut response = CheckUpdateResponse::default();

        for name in TOP_LEVEL_ARTIFACTS {
            let update = self.check_one(name, &self.staged_path(name))?;
            match name {
                "manifest" => response.manifest = update,
                "policy" => response.policy = update,
                "settings" => response.settings = update,
                "data" => response.data = update,
                _ => unreachable!(),
            }
        }

        for pair in request.virtual_policy.keys() {
            let key = format!("policy_{}", pair.dir_name());
            let path = self.staging_dir.join(format!("{key}.json"));
            if let Some(update) = self.check_one(&key, &path)? {
                response.virtual_policy.insert(pair.clone(), update);
            }
        }

        for pair in request.virtual_settings.keys() {
            let key = format!("settings_{}", pair.dir_name());
            let path = self.staging_dir.join(format!("{key}.json"));
            if let Some(update) = self.check_one(&key, &path)? {
                response.virtual_settings.insert(pair.clone(), update);
            }
        }

        Ok(response)
    }

    async fn fetch(&self, download_path: &str, checksum: &str) -> Result<PathBuf> {
        let path = PathBuf::from(download_path);
        let actual = orchestration_tools::calculate_checksum(SELECTED_CHECKSUM_TYPE, &path)?;
        if actual != checksum {
            return Err(downloader::Error::ChecksumMismatch {
                resource: download_path.to_string(),
                expected: checksum.to_string(),
                actual,
            }
            .into());
        }

        let key = TOP_LEVEL_ARTIFACTS
            .iter()
            .find(|name| path == self.staged_path(name))
            .map(|name| name.to_string())
            .unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
        self.mark_consumed(&key, &actual);

        Ok(path)
    }
}
