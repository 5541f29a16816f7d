//! Manifest diffing: the `current` vs. `new` vs. `corrupted` snapshot
//! algebra described in spec §4.B.

use crate::package::{Package, ORCHESTRATION_SERVICE_NAME};
use std::collections::HashMap;

/// A package-name → [`Package`] map, as persisted to `manifest.json`.
pub type Manifest = HashMap<String, Package>;

/// `name -> checksum` of packages whose last installation attempt failed;
/// retries are suppressed until the checksum changes.
pub type CorruptedPackages = HashMap<String, String>;

/// Packages present in `current` but missing from `new`.
///
/// As a side effect, mutates `new` to remove any entry that is identical
/// (by [`Package`] equality, i.e. matching `checksum_type`/`checksum`) to
/// its `current` counterpart, so that only genuinely changed packages
/// remain for the caller to install.
///
/// The orchestrator's own service name is never included in the returned
/// map — it must never be listed for removal, since it replaces itself
/// through the self-update path instead.
pub fn filter_untracked_packages(current: &Manifest, new: &mut Manifest) -> Manifest {
    let mut to_uninstall = Manifest::new();

    for (name, current_pkg) in current {
        match new.get(name) {
            Some(new_pkg) if new_pkg == current_pkg => {
                new.remove(name);
            }
            Some(_) => {}
            None => {
                if name != ORCHESTRATION_SERVICE_NAME {
                    to_uninstall.insert(name.clone(), current_pkg.clone());
                }
            }
        }
    }

    to_uninstall
}

/// Drop entries from `new` whose `(name, checksum)` matches a corrupted
/// entry, and expire corrupted entries whose name appears in `new` with a
/// different checksum (new content might succeed).
pub fn filter_corrupted_packages(new: &mut Manifest, corrupted: &mut CorruptedPackages) {
    new.retain(|name, pkg| match corrupted.get(name) {
        Some(bad_checksum) => pkg.checksum != *bad_checksum,
        None => true,
    });

    corrupted.retain(|name, bad_checksum| match new.get(name) {
        Some(pkg) => pkg.checksum == *bad_checksum,
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestration_tools::ChecksumType;
    use crate::package::PackageType;

    fn pkg(checksum: &str) -> Package {
        Package {
            name: "p".to_string(),
            version: "1".to_string(),
            download_path: "/x".to_string(),
            relative_path: None,
            checksum_type: ChecksumType::Sha256,
            checksum: checksum.to_string(),
            package_type: PackageType::Service,
            require: vec![],
            installable: Ok(()),
        }
    }

    #[test]
    fn untracked_detects_removed_and_strips_unchanged() {
        let mut current = Manifest::new();
        current.insert("a".to_string(), pkg("h1"));
        current.insert("b".to_string(), pkg("h2"));

        let mut new = Manifest::new();
        new.insert("a".to_string(), pkg("h1")); // unchanged
        // "b" missing -> to uninstall

        let to_uninstall = filter_untracked_packages(&current, &mut new);
        assert_eq!(to_uninstall.len(), 1);
        assert!(to_uninstall.contains_key("b"));
        assert!(!new.contains_key("a"), "unchanged package stripped from new");
    }

    #[test]
    fn self_package_never_listed_for_removal() {
        let mut current = Manifest::new();
        current.insert(ORCHESTRATION_SERVICE_NAME.to_string(), pkg("h1"));
        let mut new = Manifest::new();

        let to_uninstall = filter_untracked_packages(&current, &mut new);
        assert!(to_uninstall.is_empty());
    }

    #[test]
    fn diff_is_deterministic() {
        let mut current = Manifest::new();
        current.insert("a".to_string(), pkg("h1"));
        let mut new1 = Manifest::new();
        new1.insert("a".to_string(), pkg("h1"));
        let mut new2 = new1.clone();

        let r1 = filter_untracked_packages(&current, &mut new1);
        let r2 = filter_untracked_packages(&current, &mut new2);
        assert_eq!(r1.keys().collect::<Vec<_>>(), r2.keys().collect::<Vec<_>>());
        assert_eq!(new1.len(), new2.len());
    }

    #[test]
    fn corrupted_is_dropped_then_expires_on_checksum_change() {
        let mut new = Manifest::new();
        new.insert("p1".to_string(), pkg("h1"));
        let mut corrupted = CorruptedPackages::new();
        corrupted.insert("p1".to_string(), "h1".to_string());

        filter_corrupted_packages(&mut new, &mut corrupted);
        assert!(!new.contains_key("p1"));
        assert!(corrupted.contains_key("p1"));

        // next tick: p1 now has a different checksum, should be retried
        let mut new2 = Manifest::new();
        new2.insert("p1".to_string(), pkg("h2"));
        filter_corrupted_packages(&mut new2, &mut corrupted);
        assert!(new2.contains_key("p1"));
        assert!(!corrupted.contains_key("p1"));
    }
}
