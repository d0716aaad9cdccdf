//! Directory of all known packages.
//!
//! Installed packages are indexed by hash; everything (installed or ghost)
//! is indexed by primary name and by every alias, so alias lookups cost the
//! same as name lookups.

use crate::core::lists::PackageLists;
use crate::core::package::PackageRef;
use crate::core::pattern::PackagePattern;
use std::collections::{HashMap, HashSet};

pub type Predicate = fn(&PackageRef) -> bool;

pub fn installed(pkg: &PackageRef) -> bool {
    pkg.is_installed()
}

pub fn not_installed(pkg: &PackageRef) -> bool {
    !pkg.is_installed()
}

pub fn any(_pkg: &PackageRef) -> bool {
    true
}

#[derive(Debug, Default)]
pub struct Directory {
    by_hash: HashMap<String, PackageRef>,
    by_name: HashMap<String, Vec<PackageRef>>,
}

impl Directory {
    pub fn new() -> Self {
        Directory::default()
    }

    pub fn insert(&mut self, pkg: PackageRef) {
        if !pkg.hash().is_empty() {
            self.by_hash.insert(pkg.hash().to_string(), pkg.clone());
        }
        self.by_name
            .entry(pkg.name().to_string())
            .or_default()
            .push(pkg.clone());
        for alias in pkg.aliases() {
            self.by_name.entry(alias.clone()).or_default().push(pkg.clone());
        }
    }

    pub fn insert_all(&mut self, pkgs: impl IntoIterator<Item = PackageRef>) {
        for pkg in pkgs {
            self.insert(pkg);
        }
    }

    /// Drop a package from every index, aliases included.
    pub fn erase(&mut self, pkg: &PackageRef) {
        if !pkg.hash().is_empty() {
            self.by_hash.remove(pkg.hash());
        }
        let spec = pkg.to_string();
        let mut names: Vec<&str> = vec![pkg.name()];
        names.extend(pkg.aliases().iter().map(String::as_str));
        for name in names {
            if let Some(list) = self.by_name.get_mut(name) {
                list.retain(|p| p.to_string() != spec);
            }
        }
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<&PackageRef> {
        self.by_hash.get(hash)
    }

    /// All packages matching a pattern and a predicate, using the narrowest
    /// index the pattern allows, deduplicated (an aliased package shows up
    /// in several name lists), and sorted best-first.
    pub fn find(&self, pattern: &PackagePattern, predicate: Predicate) -> Vec<PackageRef> {
        let candidates: Vec<PackageRef> = if !pattern.hash().is_empty() {
            self.by_hash.get(pattern.hash()).cloned().into_iter().collect()
        } else if !pattern.name().is_empty() {
            self.by_name.get(pattern.name()).cloned().unwrap_or_default()
        } else {
            self.by_name.values().flatten().cloned().collect()
        };

        let mut seen: HashSet<*const crate::core::package::Package> = HashSet::new();
        let mut retval: Vec<PackageRef> = candidates
            .into_iter()
            .filter(|pkg| pattern.matches(pkg) && predicate(pkg))
            .filter(|pkg| seen.insert(std::sync::Arc::as_ptr(pkg)))
            .collect();

        PackageLists::sort_packages(&mut retval);
        retval
    }
}
