//! Per-session side tables filled during normalization.
//!
//! All maps are `BTreeMap`s so every consumer iterates in sorted order; the
//! config emitter relies on that for byte-identical output.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default name of the directory dependency packages are installed into.
pub const DEFAULT_CONTAINER_DIR: &str = "node_modules";

/// What is known about one dependency package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    /// Package root relative to the base directory, URL-encoded.
    pub root_path: String,
    /// Entry file relative to `root_path`, only when resolution landed on
    /// the package's own entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_path: Option<String>,
}

/// Package name -> spec.
pub type PackageTable = BTreeMap<String, PackageSpec>;

/// Grouping key -> names of the packages installed under it.
pub type RepositoryTable = BTreeMap<String, BTreeSet<String>>;

/// Relative original path -> relative corrected path.
pub type FixTable = BTreeMap<String, String>;

/// The three tables one bundling session accumulates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTables {
    pub packages: PackageTable,
    pub repositories: RepositoryTable,
    pub fixes: FixTable,
}

impl ResolutionTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `spec` under `name` and register it with its grouping key.
    ///
    /// Recording the same name again overwrites the spec; a name that moved
    /// to a different root is removed from its old group.
    pub fn record_package(&mut self, name: &str, spec: PackageSpec, container: &str) {
        let key = grouping_key(&spec.root_path, container);

        if let Some(previous) = self.packages.get(name) {
            let previous_key = grouping_key(&previous.root_path, container);
            if previous_key != key {
                if let Some(members) = self.repositories.get_mut(&previous_key) {
                    members.remove(name);
                    if members.is_empty() {
                        self.repositories.remove(&previous_key);
                    }
                }
            }
        }

        self.repositories
            .entry(key)
            .or_default()
            .insert(name.to_string());
        self.packages.insert(name.to_string(), spec);
    }

    /// Record a load-time path rewrite.
    pub fn record_fix(&mut self, from: String, to: String) {
        self.fixes.insert(from, to);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.repositories.is_empty() && self.fixes.is_empty()
    }
}

/// Compute the repository grouping key of a package root.
///
/// The root is cut right after the first segment equal to `container`, so
/// nested dependency containers collapse to their outermost ancestor. A root
/// without a container segment is its own key.
#[must_use]
pub fn grouping_key(root_path: &str, container: &str) -> String {
    let segments: Vec<&str> = root_path.split('/').collect();
    match segments.iter().position(|segment| *segment == container) {
        Some(idx) => segments[..=idx].join("/"),
        None => root_path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(root: &str, entry: Option<&str>) -> PackageSpec {
        PackageSpec {
            root_path: root.to_string(),
            entry_path: entry.map(str::to_string),
        }
    }

    #[test]
    fn test_grouping_key_collapses_nested_containers() {
        assert_eq!(grouping_key("deps/x", "deps"), "deps");
        assert_eq!(grouping_key("deps/y/node_modules/z", "deps"), "deps");
    }

    #[test]
    fn test_grouping_key_keeps_prefix_before_container() {
        assert_eq!(
            grouping_key("../shared/node_modules/a/node_modules/b", "node_modules"),
            "../shared/node_modules"
        );
    }

    #[test]
    fn test_grouping_key_without_container() {
        assert_eq!(grouping_key("vendor/lib", "node_modules"), "vendor/lib");
    }

    #[test]
    fn test_nested_packages_share_one_repository() {
        let mut tables = ResolutionTables::new();
        tables.record_package("x", spec("deps/x", Some("index.js")), "deps");
        tables.record_package("z", spec("deps/y/node_modules/z", None), "deps");

        assert_eq!(tables.repositories.len(), 1);
        let members: Vec<_> = tables.repositories["deps"].iter().cloned().collect();
        assert_eq!(members, vec!["x".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_record_package_is_idempotent() {
        let mut tables = ResolutionTables::new();
        tables.record_package("a", spec("node_modules/a", Some("lib/a.js")), "node_modules");
        let snapshot = tables.clone();

        tables.record_package("a", spec("node_modules/a", Some("lib/a.js")), "node_modules");
        assert_eq!(tables, snapshot);
    }

    #[test]
    fn test_record_package_moves_group_on_new_root() {
        let mut tables = ResolutionTables::new();
        tables.record_package("a", spec("node_modules/a", None), "node_modules");
        tables.record_package("a", spec("vendor/a", None), "node_modules");

        assert!(!tables.repositories.contains_key("node_modules"));
        assert!(tables.repositories["vendor/a"].contains("a"));
    }
}
