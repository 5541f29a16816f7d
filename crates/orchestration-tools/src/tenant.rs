//! The tenant/profile addressing unit for multi-tenant configuration.

use serde::{Deserialize, Serialize};

/// `(tenant_id, profile_id)`; empty strings denote the singleton
/// non-multi-tenant case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantProfilePair {
    /// The tenant identifier, or empty for the singleton case.
    pub tenant_id: String,
    /// The profile identifier, or empty for the singleton case.
    pub profile_id: String,
}

impl TenantProfilePair {
    /// Build a pair from raw ids.
    pub fn new(tenant_id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            profile_id: profile_id.into(),
        }
    }

    /// The singleton, non-multi-tenant pair.
    pub fn singleton() -> Self {
        Self::new("", "")
    }

    /// Whether this is the singleton non-multi-tenant case.
    pub fn is_singleton(&self) -> bool {
        self.tenant_id.is_empty() && self.profile_id.is_empty()
    }

    /// The `conf/tenant_<t>_profile_<p>/` directory name for this pair.
    pub fn dir_name(&self) -> String {
        crate::tenant_profile_dir_name(&self.tenant_id, &self.profile_id)
    }

    /// The `tenant_<t>_profile_<p>_settings.json` file name for this pair.
    pub fn settings_file_name(&self) -> String {
        crate::tenant_profile_settings_name(&self.tenant_id, &self.profile_id)
    }
}

impl std::fmt::Display for TenantProfilePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.tenant_id, self.profile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_pair_has_empty_ids() {
        let pair = TenantProfilePair::singleton();
        assert!(pair.is_singleton());
        assert_eq!(pair.dir_name(), "tenant__profile_");
    }

    #[test]
    fn named_pair_builds_expected_dir_name() {
        let pair = TenantProfilePair::new("t1", "p1");
        assert!(!pair.is_singleton());
        assert_eq!(pair.dir_name(), "tenant_t1_profile_p1");
        assert_eq!(pair.settings_file_name(), "tenant_t1_profile_p1_settings.json");
    }
}
