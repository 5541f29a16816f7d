//! Installation queue construction: a `require`-respecting topological sort.
//!
//! Grounded on `service_orchestration::orchestrator::DependencyGraph`'s
//! Kahn's-algorithm toposort, generalized from service/task dependency edges
//! to [`crate::Package::require`].

use crate::error::{Error, Result};
use crate::package::Package;
use std::collections::{HashMap, HashSet, VecDeque};

/// Packages that must always install last, in this order, because anything
/// else in the queue may depend on them.
const INSTALL_LAST: [&str; 2] = ["accessControlApp", "accessControlKernel"];

/// Build the installation order for `to_install`, honoring each package's
/// `require` list: if an updated package depends on another package that is
/// itself being updated, the dependency is queued first. A cycle among
/// `require` edges is reported as an error.
///
/// `accessControlApp` and `accessControlKernel`, if present in
/// `to_install`, are always appended last (in that order), since they must
/// install after everything that could depend on them.
pub fn build_installation_queue(to_install: &HashMap<String, Package>) -> Result<Vec<String>> {
    let mut names: Vec<&String> = to_install.keys().collect();
    names.sort();

    let mut in_degree: HashMap<&str, usize> = names.iter().map(|n| (n.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = names.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for name in &names {
        let pkg = &to_install[*name];
        for dep in &pkg.require {
            if dep == *name {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(name.as_str()) {
                if to_install.contains_key(dep) {
                    *degree += 1;
                    dependents.get_mut(dep.as_str()).unwrap().push(name.as_str());
                }
            }
        }
    }

    let mut queue: VecDeque<&str> = names
        .iter()
        .filter(|n| in_degree[n.as_str()] == 0)
        .map(|n| n.as_str())
        .collect();
    let mut queued: HashSet<&str> = queue.iter().copied().collect();

    let mut result: Vec<String> = Vec::with_capacity(names.len());
    while let Some(name) = queue.pop_front() {
        result.push(name.to_string());
        let mut next: Vec<&str> = Vec::new();
        for dependent in &dependents[name] {
            let degree = in_degree.get_mut(dependent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                next.push(dependent);
            }
        }
        next.sort();
        for n in next {
            if queued.insert(n) {
                queue.push_back(n);
            }
        }
    }

    if result.len() != names.len() {
        let remaining: Vec<String> = names
            .iter()
            .filter(|n| !result.contains(&n.to_string()))
            .map(|n| n.to_string())
            .collect();
        return Err(Error::CyclicDependency(remaining));
    }

    reorder_install_last(&mut result);
    Ok(result)
}

fn reorder_install_last(queue: &mut Vec<String>) {
    for special in INSTALL_LAST {
        if let Some(pos) = queue.iter().position(|n| n == special) {
            let name = queue.remove(pos);
            queue.push(name);
        }
    }
}
