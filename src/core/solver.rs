//! Backtracking package-constraint solver.
//!
//! The solver explores assignments over a growing list of candidate lists:
//! one list per user pattern, extended on the fly with lists for the
//! dependencies of whatever candidate is being tried. A partial solution is
//! a set of constraints (packages that must appear in every completion);
//! appending a candidate to the constraints can fail, merge with an
//! existing constraint, or tighten a ghost onto a smaller version set, in
//! which case every later constraint is re-validated against the tightened
//! one. Conflicts never abort the search; they are recorded as messages and
//! the search backtracks.

use crate::core::directory::{self, Directory};
use crate::core::lattice::DependencyLattice;
use crate::core::lists::PackageLists;
use crate::core::package::{Package, PackageRef};
use crate::core::pattern::PackagePattern;
use crate::core::version::VersionSet;
use crate::error::{Result, SpockError};
use crate::ui;
use std::collections::BTreeSet;
use std::sync::Arc;

type Constraints = Vec<PackageRef>;

pub struct Solver<'a> {
    directory: &'a Directory,
    employed: Vec<PackageRef>,
    max_solutions: usize,
    full_solutions: bool,
    only_installed: bool,
    solutions: Vec<Vec<PackageRef>>,
    messages: BTreeSet<String>,
    latest_message: String,
    n_steps: usize,
}

impl<'a> Solver<'a> {
    /// A solver over a directory snapshot and the packages already in use.
    pub fn new(directory: &'a Directory, employed: &[PackageRef]) -> Self {
        Solver {
            directory,
            employed: employed.to_vec(),
            max_solutions: 1,
            full_solutions: true,
            only_installed: true,
            solutions: Vec::new(),
            messages: BTreeSet::new(),
            latest_message: String::new(),
            n_steps: 0,
        }
    }

    /// Stop after this many solutions (default 1).
    pub fn max_solutions(&mut self, n: usize) -> &mut Self {
        self.max_solutions = n;
        self
    }

    /// Report transitive constraints in each solution, not only the
    /// top-level selections (default true). Does not affect the search.
    pub fn full_solutions(&mut self, b: bool) -> &mut Self {
        self.full_solutions = b;
        self
    }

    /// Advisory: callers resolving build dependencies want solutions made
    /// of installed packages only and should pass pre-filtered patterns or
    /// post-filter the solution (default true).
    pub fn only_installed(&mut self, b: bool) -> &mut Self {
        self.only_installed = b;
        self
    }

    pub fn is_only_installed(&self) -> bool {
        self.only_installed
    }

    pub fn n_solutions(&self) -> usize {
        self.solutions.len()
    }

    pub fn solution(&self, n: usize) -> &[PackageRef] {
        &self.solutions[n]
    }

    /// Deduplicated reasons gathered while searching. Present even when a
    /// solution was found (dead ends still leave messages behind).
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// Number of steps the last solve needed.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Print every message; errors if nothing was found, warnings if the
    /// search still succeeded.
    pub fn show_messages(&self) {
        for message in self.messages() {
            if self.solutions.is_empty() {
                ui::error(message);
            } else {
                ui::warning(message);
            }
        }
    }

    fn insert_message(&mut self, message: String) {
        self.latest_message = message.clone();
        self.messages.insert(message);
    }

    /// Find solutions for one pattern.
    pub fn solve_one(&mut self, pattern: &PackagePattern) -> Result<usize> {
        self.solve(std::slice::from_ref(pattern))
    }

    /// Find up to `max_solutions` solutions satisfying all the patterns
    /// together with the employed packages. Returns how many were found.
    pub fn solve(&mut self, patterns: &[PackagePattern]) -> Result<usize> {
        ui::debug("starting solver");
        self.solutions.clear();
        self.messages.clear();
        self.latest_message.clear();
        self.n_steps = 0;

        // The employed packages are non-negotiable constraints. They all
        // have hashes, so this is quick.
        let mut constraints = Constraints::new();
        for pkg in self.employed.clone() {
            match self.append_constraint(&constraints, &pkg) {
                Some((appended, _)) => constraints = appended,
                None => return Ok(0),
            }
        }

        let mut plists = PackageLists::new();
        self.extend_lists(&constraints, &mut plists, patterns)?;

        if !plists.is_any_list_empty() {
            let mut indexes = Vec::new();
            self.solve_recurse(&constraints, &mut plists, &mut indexes)?;
        }
        Ok(self.solutions.len())
    }

    // For each pattern, find the list of matching packages and append it to
    // plists unless an identical list, or a singleton that is already a
    // constraint, makes it redundant. An empty appended list is the "no
    // solution possible" marker the callers watch for.
    fn extend_lists(
        &mut self,
        constraints: &Constraints,
        plists: &mut PackageLists,
        patterns: &[PackagePattern],
    ) -> Result<()> {
        for pattern in patterns {
            if pattern.name().is_empty() {
                return Err(SpockError::NotFound(format!(
                    "no package name in \"{pattern}\""
                )));
            }

            let mut found = self.directory.find(pattern, directory::any);

            // Restrict ghosts to the versions the pattern accepts.
            if !pattern.version().is_empty() {
                for slot in &mut found {
                    if let Some(ghost) = slot.as_ghost() {
                        let matching: VersionSet = ghost
                            .versions()
                            .iter()
                            .filter(|v| pattern.matches_version(v))
                            .cloned()
                            .collect();
                        if matching != *ghost.versions() {
                            *slot = Arc::new(Package::Ghost(ghost.with_versions(matching)?));
                        }
                    }
                }
            }

            if found.is_empty() {
                self.insert_message(format!("no matching packages for {pattern}"));
                plists.insert(found);
                return Ok(());
            }

            // Remove candidates the constraints already rule out.
            found.retain(|candidate| {
                match constraints.iter().find(|c| c.excludes(candidate)) {
                    Some(conflicting) => {
                        self.insert_message(format!(
                            "{candidate} conflicts with {conflicting}"
                        ));
                        false
                    }
                    None => true,
                }
            });
            if found.is_empty() {
                plists.insert(found);
                return Ok(());
            }

            // A singleton that is already a constraint adds nothing.
            let is_constraint =
                found.len() == 1 && constraints.iter().any(|c| found[0].identical(c));
            if !is_constraint {
                PackageLists::sort_packages(&mut found);
                if !plists.list_exists(&found) {
                    plists.insert(found);
                }
            }
        }
        Ok(())
    }

    // Depth-first extension of the partial solution formed by the first
    // `indexes.len()` lists. Restores plists and indexes before returning
    // to the caller's level.
    fn solve_recurse(
        &mut self,
        constraints: &Constraints,
        plists: &mut PackageLists,
        indexes: &mut Vec<usize>,
    ) -> Result<()> {
        let list_number = indexes.len();
        self.n_steps += 1;

        if self.solutions.len() >= self.max_solutions {
            return Ok(());
        }

        // Every list has a selection: that is a solution.
        if list_number == plists.len() {
            let mut soln: Vec<PackageRef> = if self.full_solutions {
                constraints.clone()
            } else {
                indexes
                    .iter()
                    .enumerate()
                    .map(|(list, &i)| plists.list(list)[i].clone())
                    .collect()
            };
            soln.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
            soln.dedup_by(|a, b| a.to_string() == b.to_string());
            DependencyLattice::build(&soln)?.sort_packages(&mut soln);
            ui::debug(&format!(
                "found solution #{}: {}",
                self.solutions.len(),
                soln.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ")
            ));
            self.solutions.push(soln);
            return Ok(());
        }

        let old_plist_len = plists.len();
        for i in 0..plists.list_len(list_number) {
            indexes.push(i);
            let trying = plists.list(list_number)[i].clone();
            ui::debug(&format!(
                "attempting to extend with #{list_number}.{i} {trying}"
            ));

            match self.append_constraint(constraints, &trying) {
                None => {
                    ui::debug(&format!(
                        "failed to extend with #{list_number}.{i} {trying}"
                    ));
                }
                Some((new_constraints, need_deps)) => {
                    if need_deps {
                        // The candidate really was added, so its
                        // dependencies become open requirements too.
                        self.extend_lists(
                            &new_constraints,
                            plists,
                            &trying.dependency_patterns(),
                        )?;
                    }
                    if !plists.is_any_list_empty() {
                        self.solve_recurse(&new_constraints, plists, indexes)?;
                        if self.solutions.len() >= self.max_solutions {
                            return Ok(());
                        }
                    }
                }
            }

            plists.truncate(old_plist_len);
            indexes.truncate(list_number);
        }
        Ok(())
    }

    // Add one package to the constraints, returning the new constraint list
    // and whether the package's dependencies still need to be enqueued.
    // Returns None when the package cannot coexist with the constraints;
    // the reason is recorded as a message.
    fn append_constraint(
        &mut self,
        constraints: &Constraints,
        pkg: &PackageRef,
    ) -> Option<(Constraints, bool)> {
        let mut retval = Constraints::new();

        for (i, constraint) in constraints.iter().enumerate() {
            if pkg.name() != constraint.name() {
                // Different names conflict exactly when a name or alias is
                // shared; gnu-c++11 and gnu-c++03 both answer to
                // c++-compiler and cannot be employed together.
                let common = pkg.names_in_common(constraint);
                if common.is_empty() {
                    retval.push(constraint.clone());
                    continue;
                }
                let names: Vec<&str> = common.iter().map(String::as_str).collect();
                self.insert_message(format!(
                    "{pkg} and {constraint} have overlapping aliases and therefore \
                     cannot be used simultaneously: {}",
                    names.join(" ")
                ));
                return None;
            }

            if pkg.is_installed() && constraint.is_installed() {
                // Same name, both concrete: the hashes decide.
                if pkg.hash() == constraint.hash() {
                    retval.extend(constraints[i..].iter().cloned());
                    return Some((retval, false));
                }
                self.insert_message(format!("{pkg} conflicts with {constraint}"));
                return None;
            }

            if !pkg.is_installed() && !constraint.is_installed() {
                // Two ghosts: intersect their version sets. A strictly
                // smaller intersection replaces the constraint, after which
                // every later constraint must be re-checked against it.
                let versions = pkg.versions().intersection(&constraint.versions());
                if versions == constraint.versions() {
                    retval.extend(constraints[i..].iter().cloned());
                    return Some((retval, false));
                }
                if !versions.is_empty() {
                    let ghost = constraint
                        .as_ghost()
                        .expect("non-installed package is a ghost");
                    let tightened = match ghost.with_versions(versions) {
                        Ok(g) => Arc::new(Package::Ghost(g)),
                        Err(_) => {
                            self.insert_message(format!(
                                "{pkg} conflicts with {constraint}"
                            ));
                            return None;
                        }
                    };
                    retval.push(tightened);
                    for later in &constraints[i + 1..] {
                        let (reapplied, _) = self.append_constraint(&retval, later)?;
                        retval = reapplied;
                    }
                    return Some((retval, false));
                }
                self.insert_message(format!(
                    "for package {}, version sets {} and {} are disjoint",
                    pkg.name(),
                    braced_versions(&pkg.versions()),
                    braced_versions(&constraint.versions()),
                ));
                return None;
            }

            // One side is installed, the other a ghost. When the installed
            // version is acceptable to the ghost, the installed package is
            // the tighter constraint; re-validate everything after it.
            let (installed_ref, ghost) = if pkg.is_installed() {
                (pkg.clone(), constraint.as_ghost().expect("ghost side"))
            } else {
                (constraint.clone(), pkg.as_ghost().expect("ghost side"))
            };
            if ghost.is_valid_version(installed_ref.version()) {
                retval.push(installed_ref);
                for later in &constraints[i + 1..] {
                    let (reapplied, _) = self.append_constraint(&retval, later)?;
                    retval = reapplied;
                }
                // Replacing a ghost constraint with a concrete package
                // opens up the concrete package's dependencies.
                let need_deps = !constraint.is_installed();
                return Some((retval, need_deps));
            }
            self.insert_message(format!(
                "{installed_ref} does not match any of {}",
                braced_versions(ghost.versions()),
            ));
            return None;
        }

        // Nothing merged and nothing conflicted: a genuinely new constraint.
        retval.push(pkg.clone());
        Some((retval, true))
    }
}

fn braced_versions(versions: &VersionSet) -> String {
    let mut s = String::from("{");
    for v in versions.iter() {
        s.push(' ');
        s.push_str(&v.to_string());
    }
    s.push_str(" }");
    s
}
