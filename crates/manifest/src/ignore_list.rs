//! The ignore-list: package names exempt from manifest updates.

use std::collections::HashSet;

/// Sentinel that disables all updates.
pub const IGNORE_ALL: &str = "all";
/// Sentinel that clears the ignore-list.
pub const IGNORE_NONE: &str = "none";

/// A set of package names that must never be updated, drawn from
/// `ignore-packages.txt` and overridable by a profile setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    names: HashSet<String>,
    ignore_all: bool,
}

impl IgnoreList {
    /// Parse one package name per line, honoring the `all`/`none` sentinels.
    pub fn parse(text: &str) -> Self {
        let mut names = HashSet::new();
        let mut ignore_all = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line {
                IGNORE_ALL => ignore_all = true,
                IGNORE_NONE => {
                    names.clear();
                    ignore_all = false;
                }
                name => {
                    names.insert(name.to_string());
                }
            }
        }

        Self { names, ignore_all }
    }

    /// Serialize back to the one-name-per-line text format.
    pub fn to_text(&self) -> String {
        if self.ignore_all {
            return format!("{IGNORE_ALL}\n");
        }
        let mut names: Vec<&String> = self.names.iter().collect();
        names.sort();
        names.into_iter().fold(String::new(), |mut acc, n| {
            acc.push_str(n);
            acc.push('\n');
            acc
        })
    }

    /// An ignore-list containing only the `all` sentinel.
    pub fn all() -> Self {
        Self {
            names: HashSet::new(),
            ignore_all: true,
        }
    }

    /// Whether every package name is ignored.
    pub fn ignores_all(&self) -> bool {
        self.ignore_all
    }

    /// Whether `name` is on the ignore-list.
    pub fn contains(&self, name: &str) -> bool {
        self.ignore_all || self.names.contains(name)
    }

    /// Iterate the explicitly-named ignored packages (empty when
    /// [`Self::ignores_all`]).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
