//! Multi-tenant fan-out: the active `(tenant, profile)` set, and the
//! periodic sweep that deletes stale pair directories (spec §4.I's
//! "Multi-tenant fan-out" and "Garbage collection").

use crate::error::Result;
use orchestration_tools::TenantProfilePair;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Default interval between garbage-collection sweeps (spec: daily).
pub const DEFAULT_GC_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Tracks which `(tenant, profile)` pairs are currently active, i.e. own a
/// live directory under `conf/`. Activation/deactivation is driven by
/// `handleVirtualFiles` (spec §4.J's APPLY stage) observing which pairs
/// the fog still reports.
#[derive(Default)]
pub struct TenantManager {
    active: RwLock<HashSet<TenantProfilePair>>,
}

impl TenantManager {
    /// Build an empty tenant manager (the singleton pair is never tracked
    /// here; it has no per-pair directory).
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pair active, e.g. after its virtual policy/settings were
    /// successfully downloaded and written.
    pub fn activate(&self, pair: TenantProfilePair) {
        self.active.write().expect("tenant manager lock poisoned").insert(pair);
    }

    /// Mark a pair inactive (it disappeared from the fog's response) and
    /// remove its on-disk files, mirroring spec §4.I's
    /// "deactivating tenants that disappeared".
    pub fn deactivate(&self, pair: &TenantProfilePair, conf_dir: impl AsRef<Path>) -> Result<()> {
        self.active.write().expect("tenant manager lock poisoned").remove(pair);
        orchestration_tools::delete_virtual_tenant_profile_files(&pair.tenant_id, &pair.profile_id, conf_dir)?;
        Ok(())
    }

    /// Replace the entire active set in one step, deactivating (and
    /// deleting the files of) every pair absent from `current`. Used when
    /// a POLL response enumerates the full set of pairs the fog still
    /// knows about, rather than reporting deltas.
    pub fn reconcile(&self, current: HashSet<TenantProfilePair>, conf_dir: impl AsRef<Path>) -> Result<()> {
        let conf_dir = conf_dir.as_ref();
        let stale: Vec<TenantProfilePair> = {
            let active = self.active.read().expect("tenant manager lock poisoned");
            active.difference(&current).cloned().collect()
        };
        for pair in &stale {
            self.deactivate(pair, conf_dir)?;
        }
        *self.active.write().expect("tenant manager lock poisoned") = current;
        Ok(())
    }

    /// The currently active pairs.
    pub fn active_pairs(&self) -> Vec<TenantProfilePair> {
        self.active.read().expect("tenant manager lock poisoned").iter().cloned().collect()
    }

    /// Whether `pair` is currently active.
    pub fn is_active(&self, pair: &TenantProfilePair) -> bool {
        self.active.read().expect("tenant manager lock poisoned").contains(pair)
    }
}

/// List every `tenant_<t>_profile_<p>` directory directly under `conf_dir`.
fn list_tenant_profile_dirs(conf_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(conf_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("tenant_") && name.contains("_profile_") {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn parse_pair_from_dir_name(name: &str) -> Option<TenantProfilePair> {
    let rest = name.strip_prefix("tenant_")?;
    let (tenant_id, profile_id) = rest.split_once("_profile_")?;
    Some(TenantProfilePair::new(tenant_id, profile_id))
}

/// Sweep `conf_dir` for `tenant_*_profile_*` directories that no longer
/// correspond to an active pair and delete them, returning the pairs that
/// were collected (spec §4.I's "Garbage collection").
pub fn collect_garbage(manager: &TenantManager, conf_dir: impl AsRef<Path>) -> Result<Vec<TenantProfilePair>> {
    let conf_dir = conf_dir.as_ref();
    let on_disk = match list_tenant_profile_dirs(conf_dir) {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(orchestration_tools::Error::Io {
            path: conf_dir.display().to_string(),
            source: e,
        }.into()),
    };

    let mut collected = Vec::new();
    for dir in on_disk {
        let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let Some(pair) = parse_pair_from_dir_name(&name) else {
            continue;
        };
        if !manager.is_active(&pair) {
            orchestration_tools::remove_directory(&dir, true)?;
            let settings = conf_dir.join(pair.settings_file_name());
            orchestration_tools::remove_file(&settings)?;
            info!(tenant = %pair.tenant_id, profile = %pair.profile_id, "garbage-collected stale tenant/profile pair");
            collected.push(pair);
        }
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn activate_then_deactivate_removes_pair_and_files() {
        let dir = tempdir().unwrap();
        let pair = TenantProfilePair::new("t1", "p1");
        orchestration_tools::create_directory(dir.path().join(pair.dir_name())).unwrap();
        orchestration_tools::write_file("{}", dir.path().join(pair.settings_file_name()), false).unwrap();

        let manager = TenantManager::new();
        manager.activate(pair.clone());
        assert!(manager.is_active(&pair));

        manager.deactivate(&pair, dir.path()).unwrap();
        assert!(!manager.is_active(&pair));
        assert!(!dir.path().join(pair.dir_name()).exists());
    }

    #[test]
    fn reconcile_deactivates_pairs_absent_from_current_set() {
        let dir = tempdir().unwrap();
        let stale = TenantProfilePair::new("t1", "p1");
        let kept = TenantProfilePair::new("t2", "p2");
        orchestration_tools::create_directory(dir.path().join(stale.dir_name())).unwrap();
        orchestration_tools::create_directory(dir.path().join(kept.dir_name())).unwrap();

        let manager = TenantManager::new();
        manager.activate(stale.clone());
        manager.activate(kept.clone());

        let mut current = HashSet::new();
        current.insert(kept.clone());
        manager.reconcile(current, dir.path()).unwrap();

        assert!(!manager.is_active(&stale));
        assert!(manager.is_active(&kept));
        assert!(!dir.path().join(stale.dir_name()).exists());
    }

    #[test]
    fn collect_garbage_removes_only_inactive_directories() {
        let dir = tempdir().unwrap();
        let active_pair = TenantProfilePair::new("t1", "p1");
        let stale_pair = TenantProfilePair::new("t2", "p2");
        orchestration_tools::create_directory(dir.path().join(active_pair.dir_name())).unwrap();
        orchestration_tools::create_directory(dir.path().join(stale_pair.dir_name())).unwrap();

        let manager = TenantManager::new();
        manager.activate(active_pair.clone());

        let collected = collect_garbage(&manager, dir.path()).unwrap();

        assert_eq!(collected, vec![stale_pair.clone()]);
        assert!(dir.path().join(active_pair.dir_name()).exists());
        assert!(!dir.path().join(stale_pair.dir_name()).exists());
    }

    #[test]
    fn missing_conf_dir_collects_nothing() {
        let manager = TenantManager::new();
        let collected = collect_garbage(&manager, "/nonexistent/conf/dir/for/test").unwrap();
        assert!(collected.is_empty());
    }

    #[test]
    fn parses_tenant_and_profile_from_directory_name() {
        assert_eq!(
            parse_pair_from_dir_name("tenant_t1_profile_p1"),
            Some(TenantProfilePair::new("t1", "p1"))
        );
        assert_eq!(parse_pair_from_dir_name("not_a_tenant_dir"), None);
    }
}
