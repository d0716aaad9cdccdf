//! Lists of candidate lists.
//!
//! Each sublist holds the alternatives for one open requirement; the solver
//! picks one element from each. If the user asks for boost-1.62 and
//! gcc-4.8, one sublist might hold ten boost installations built with
//! various compilers and the other two gcc patch levels, and the search has
//! to pick a compatible pair.

use crate::core::package::PackageRef;
use std::cmp::Ordering;

#[derive(Debug, Default)]
pub struct PackageLists {
    lists: Vec<Vec<PackageRef>>,
}

/// Best-first candidate order: installed before ghosts, then name, then
/// descending version, then freshest install, then hash.
fn compare(a: &PackageRef, b: &PackageRef) -> Ordering {
    b.is_installed()
        .cmp(&a.is_installed())
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| b.version().cmp(a.version()))
        .then_with(|| {
            match (a.as_installed(), b.as_installed()) {
                (Some(ai), Some(bi)) => bi.timestamp().cmp(&ai.timestamp()),
                _ => Ordering::Equal,
            }
        })
        .then_with(|| a.hash().cmp(b.hash()))
}

impl PackageLists {
    pub fn new() -> Self {
        PackageLists::default()
    }

    /// Number of sublists.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Size of one sublist.
    pub fn list_len(&self, list_number: usize) -> usize {
        self.lists[list_number].len()
    }

    pub fn list(&self, list_number: usize) -> &[PackageRef] {
        &self.lists[list_number]
    }

    /// True if some sublist exists but has no candidates, meaning no
    /// solution can satisfy its requirement.
    pub fn is_any_list_empty(&self) -> bool {
        self.lists.iter().any(|l| l.is_empty())
    }

    pub fn insert(&mut self, list: Vec<PackageRef>) {
        self.lists.push(list);
    }

    pub fn insert_one(&mut self, pkg: PackageRef) {
        self.lists.push(vec![pkg]);
    }

    /// True if an elementwise-identical list is already present.
    pub fn list_exists(&self, list: &[PackageRef]) -> bool {
        self.lists.iter().any(|existing| {
            existing.len() == list.len()
                && existing.iter().zip(list).all(|(a, b)| a.identical(b))
        })
    }

    /// Shrink to the first `n` sublists; used when the solver backtracks.
    pub fn truncate(&mut self, n: usize) {
        debug_assert!(n <= self.lists.len());
        self.lists.truncate(n);
    }

    /// Sort candidates within each sublist best-first, then order the
    /// sublists shortest-first so the search tree is narrow at the top.
    pub fn sort(&mut self) {
        for list in &mut self.lists {
            list.sort_by(compare);
        }
        self.lists.sort_by_key(Vec::len);
    }

    /// Sort one list of packages best-first.
    pub fn sort_packages(pkgs: &mut [PackageRef]) {
        pkgs.sort_by(compare);
    }
}
