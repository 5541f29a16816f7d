//! The `CheckUpdateRequest`/`CheckUpdateResponse` wire shape (spec §3):
//! a four-field tuple of (manifest, policy, settings, data), each a
//! `(checksum, optional version)` pair, plus per-(tenant, profile)
//! sub-requests for virtual policy and virtual settings.

use orchestration_tools::TenantProfilePair;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The checksum (and, for the manifest artifact, the version string) this
/// process currently holds for one of the four top-level artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactCheck {
    /// The checksum of the artifact currently on disk.
    pub checksum: String,
    /// An optional version string, carried for the manifest artifact.
    pub version: Option<String>,
}

impl ArtifactCheck {
    /// Build a check carrying just a checksum.
    pub fn checksum_only(checksum: impl Into<String>) -> Self {
        Self {
            checksum: checksum.into(),
            version: None,
        }
    }
}

/// What the fog (or local staging directory) says changed: a non-empty
/// checksum/download-path pair means "fetch this".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactUpdate {
    /// The new checksum.
    pub checksum: String,
    /// Where to fetch the new artifact from (a fog-relative path, or an
    /// absolute path for the Local backend).
    pub download_path: String,
    /// An optional version string.
    pub version: Option<String>,
}

/// A request for changes to the four top-level artifacts plus any
/// currently active virtual (tenant, profile) variants.
#[derive(Debug, Clone, Default)]
pub struct CheckUpdateRequest {
    /// Current manifest checksum/version.
    pub manifest: Option<ArtifactCheck>,
    /// Current policy checksum.
    pub policy: Option<ArtifactCheck>,
    /// Current settings checksum.
    pub settings: Option<ArtifactCheck>,
    /// Current data checksum.
    pub data: Option<ArtifactCheck>,
    /// Per-(tenant, profile) virtual policy checksums.
    pub virtual_policy: HashMap<TenantProfilePair, ArtifactCheck>,
    /// Per-(tenant, profile) virtual settings checksums.
    pub virtual_settings: HashMap<TenantProfilePair, ArtifactCheck>,
    /// Set when running in hybrid/declarative mode, so the fog can tag the
    /// response accordingly.
    pub declarative_policy: bool,
}

/// The fog's (or local backend's) answer: any field present means "this
/// changed, fetch it".
#[derive(Debug, Clone, Default)]
pub struct CheckUpdateResponse {
    /// New manifest, if changed.
    pub manifest: Option<ArtifactUpdate>,
    /// New policy, if changed.
    pub policy: Option<ArtifactUpdate>,
    /// New settings, if changed.
    pub settings: Option<ArtifactUpdate>,
    /// New data, if changed.
    pub data: Option<ArtifactUpdate>,
    /// Changed per-(tenant, profile) virtual policy variants.
    pub virtual_policy: HashMap<TenantProfilePair, ArtifactUpdate>,
    /// Changed per-(tenant, profile) virtual settings variants.
    pub virtual_settings: HashMap<TenantProfilePair, ArtifactUpdate>,
}

impl CheckUpdateResponse {
    /// Whether any of the six fields indicate a change.
    pub fn has_any_change(&self) -> bool {
        self.manifest.is_some()
            || self.policy.is_some()
            || self.settings.is_some()
            || self.data.is_some()
            || !self.virtual_policy.is_empty()
            || !self.virtual_settings.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireCheckUpdateRequest<'a> {
    pub manifest: Option<&'a ArtifactCheck>,
    pub policy: Option<&'a ArtifactCheck>,
    pub settings: Option<&'a ArtifactCheck>,
    pub data: Option<&'a ArtifactCheck>,
    pub virtual_policy: Vec<WireVirtualCheck<'a>>,
    pub virtual_settings: Vec<WireVirtualCheck<'a>>,
    pub declarative_policy: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireVirtualCheck<'a> {
    pub tenant_id: &'a str,
    pub profile_id: &'a str,
    #[serde(flatten)]
    pub check: &'a ArtifactCheck,
}

impl<'a> From<&'a CheckUpdateRequest> for WireCheckUpdateRequest<'a> {
    fn from(request: &'a CheckUpdateRequest) -> Self {
        Self {
            manifest: request.manifest.as_ref(),
            policy: request.policy.as_ref(),
            settings: request.settings.as_ref(),
            data: request.data.as_ref(),
            virtual_policy: request
                .virtual_policy
                .iter()
                .map(|(pair, check)| WireVirtualCheck {
                    tenant_id: &pair.tenant_id,
                    profile_id: &pair.profile_id,
                    check,
                })
                .collect(),
            virtual_settings: request
                .virtual_settings
                .iter()
                .map(|(pair, check)| WireVirtualCheck {
                    tenant_id: &pair.tenant_id,
                    profile_id: &pair.profile_id,
                    check,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct WireVirtualUpdate {
    pub tenant_id: String,
    pub profile_id: String,
    #[serde(flatten)]
    pub update: ArtifactUpdate,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct WireCheckUpdateResponse {
    #[serde(default)]
    pub manifest: Option<ArtifactUpdate>,
    #[serde(default)]
    pub policy: Option<ArtifactUpdate>,
    #[serde(default)]
    pub settings: Option<ArtifactUpdate>,
    #[serde(default)]
    pub data: Option<ArtifactUpdate>,
    #[serde(default)]
    pub virtual_policy: Vec<WireVirtualUpdate>,
    #[serde(default)]
    pub virtual_settings: Vec<WireVirtualUpdate>,
}

impl From<WireCheckUpdateResponse> for CheckUpdateResponse {
    fn from(wire: WireCheckUpdateResponse) -> Self {
        Self {
            manifest: wire.manifest,
            policy: wire.policy,
            settings: wire.settings,
            data: wire.data,
            virtual_policy: wire
                .virtual_policy
                .into_iter()
                .map(|v| {
                    (
                        TenantProfilePair {
                            tenant_id: v.tenant_id,
                            profile_id: v.profile_id,
                        },
                        v.update,
                    )
                })
                .collect(),
            virtual_settings: wire
                .virtual_settings
                .into_iter()
                .map(|v| {
                    (
                        TenantProfilePair {
                            tenant_id: v.tenant_id,
                            profile_id: v.profile_id,
                        },
                        v.update,
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_has_no_change() {
        assert!(!CheckUpdateResponse::default().has_any_change());
    }

    #[test]
    fn manifest_only_response_has_change() {
        let response = CheckUpdateResponse {
            manifest: Some(ArtifactUpdate {
                checksum: "a".to_string(),
                download_path: "manifest".to_string(),
                version: None,
            }),
            ..Default::default()
        };
        assert!(response.has_any_change());
    }
}
