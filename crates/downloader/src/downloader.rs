//! Artifact fetch with checksum verification, against either the fog or an
//! arbitrary URL, plus the per-(tenant, profile) virtual-file batch fetch.

use crate::error::{Error, Result};
use orchestration_tools::{ChecksumType, TenantProfilePair};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fetches artifacts referenced by a manifest/policy/settings/data update,
/// verifying each against its declared checksum before handing back a local
/// path. Built over `reqwest`, the teacher's HTTP client of choice.
///
/// One transport-level retry is acceptable; a checksum mismatch is never
/// retried (spec §7 treats it as adversarial).
pub struct Downloader {
    client: reqwest::Client,
    fog_address: String,
    download_dir: PathBuf,
}

impl Downloader {
    /// Build a downloader against `fog_address`, caching fetched artifacts
    /// under `download_dir`.
    pub fn new(fog_address: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            fog_address: fog_address.into(),
            download_dir: download_dir.into(),
        }
    }

    fn dest_path(&self, name: &str) -> PathBuf {
        self.download_dir.join(name)
    }

    /// Fetch `resource` from the fog, authenticated with `access_token`, and
    /// verify it matches `checksum`/`checksum_type` exactly.
    pub async fn download_from_fog(
        &self,
        access_token: &str,
        resource: &str,
        checksum: &str,
        checksum_type: ChecksumType,
    ) -> Result<PathBuf> {
        let url = format!("{}/{}", self.fog_address.trim_end_matches('/'), resource);
        let bytes = self
            .fetch_with_one_retry(self.client.get(&url).bearer_auth(access_token), &url)
            .await?;
        self.persist_and_verify(resource, &bytes, checksum, checksum_type)
    }

    /// Fetch an artifact from an arbitrary URL (used when the fog references
    /// a third-party mirror), verifying its checksum.
    pub async fn download_from_url(
        &self,
        url: &str,
        checksum: &str,
        checksum_type: ChecksumType,
        service_name: &str,
    ) -> Result<PathBuf> {
        let bytes = self
            .fetch_with_one_retry(self.client.get(url), url)
            .await?;
        self.persist_and_verify(service_name, &bytes, checksum, checksum_type)
    }

    /// Batch-fetch the per-(tenant, profile) variant of `resource` for every
    /// pair in `pairs`, keyed by pair.
    pub async fn download_virtual_from_fog(
        &self,
        access_token: &str,
        resource: &str,
        checksum_type: ChecksumType,
        pairs: &[(TenantProfilePair, String)],
    ) -> Result<HashMap<TenantProfilePair, PathBuf>> {
        let mut out = HashMap::with_capacity(pairs.len());
        for (pair, checksum) in pairs {
            let virtual_resource = format!(
                "{resource}?tenantId={}&profileId={}",
                pair.tenant_id, pair.profile_id
            );
            let path = self
                .download_from_fog(access_token, &virtual_resource, checksum, checksum_type)
                .await?;
            out.insert(pair.clone(), path);
        }
        Ok(out)
    }

    /// Delete the cached temp file for `package_name` after a successful
    /// install.
    pub fn remove_download_file(&self, package_name: &str) -> Result<()> {
        Ok(orchestration_tools::remove_file(self.dest_path(package_name))?)
    }

    async fn fetch_with_one_retry(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<Vec<u8>> {
        let cloned = request.try_clone();
        match self.fetch_once(request, resource).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!(resource, error = %e, "download failed, retrying once");
                match cloned {
                    Some(retry) => self.fetch_once(retry, resource).await,
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch_once(&self, request: reqwest::RequestBuilder, resource: &str) -> Result<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|source| Error::Transport {
                resource: resource.to_string(),
                source,
            })?
            .error_for_status()
            .map_err(|source| Error::Transport {
                resource: resource.to_string(),
                source,
            })?;
        response.bytes().await.map(|b| b.to_vec()).map_err(|source| Error::Transport {
            resource: resource.to_string(),
            source,
        })
    }

    fn persist_and_verify(
        &self,
        name: &str,
        bytes: &[u8],
        checksum: &str,
        checksum_type: ChecksumType,
    ) -> Result<PathBuf> {
        let actual = orchestration_tools::calculate_checksum_bytes(checksum_type, bytes);
        if actual != checksum {
            return Err(Error::ChecksumMismatch {
                resource: name.to_string(),
                expected: checksum.to_string(),
                actual,
            });
        }

        orchestration_tools::create_directory(&self.download_dir)?;
        let dest = self.dest_path(name);
        std::fs::write(&dest, bytes).map_err(|source| Error::Tools(orchestration_tools::Error::Io {
            path: dest.display().to_string(),
            source,
        }))?;
        debug!(name, path = %dest.display(), "downloaded and verified artifact");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_bytes_matches_sha256_known_vector() {
        let digest = orchestration_tools::calculate_checksum_bytes(ChecksumType::Sha256, b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
