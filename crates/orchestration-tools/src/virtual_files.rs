//! Helpers for the per-(tenant, profile) "virtual" configuration files.

use crate::error::Result;
use crate::fs;
use std::path::Path;

/// Directory name for a tenant/profile pair under the configuration root.
pub fn tenant_profile_dir_name(tenant_id: &str, profile_id: &str) -> String {
    format!("tenant_{tenant_id}_profile_{profile_id}")
}

/// Settings file name for a tenant/profile pair.
pub fn tenant_profile_settings_name(tenant_id: &str, profile_id: &str) -> String {
    format!("tenant_{tenant_id}_profile_{profile_id}_settings.json")
}

/// Remove the pair-scoped directory and its `_settings.json` sibling,
/// used when a tenant/profile is deactivated or garbage-collected.
pub fn delete_virtual_tenant_profile_files(
    tenant_id: &str,
    profile_id: &str,
    conf_dir: impl AsRef<Path>,
) -> Result<()> {
    let conf_dir = conf_dir.as_ref();
    let dir = conf_dir.join(tenant_profile_dir_name(tenant_id, profile_id));
    fs::remove_directory(&dir, true)?;

    let settings = conf_dir.join(tenant_profile_settings_name(tenant_id, profile_id));
    fs::remove_file(&settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn deletes_directory_and_settings_sibling() {
        let dir = tempdir().unwrap();
        let conf = dir.path();
        fs::create_directory(conf.join("tenant_t1_profile_p1")).unwrap();
        fs::write_file("{}", conf.join("tenant_t1_profile_p1_settings.json"), false).unwrap();

        delete_virtual_tenant_profile_files("t1", "p1", conf).unwrap();

        assert!(!conf.join("tenant_t1_profile_p1").exists());
        assert!(!conf.join("tenant_t1_profile_p1_settings.json").exists());
    }

    #[test]
    fn missing_pair_is_not_an_error() {
        let dir = tempdir().unwrap();
        delete_virtual_tenant_profile_files("nope", "nope", dir.path()).unwrap();
    }
}
