//! Installed packages, ghost packages, and the reasoning shared by both.
//!
//! An installed package is backed by a manifest on disk and addressed by an
//! eight-digit hex hash. A ghost is a placeholder for one or more versions
//! a definition could install; the solver narrows ghosts by rebuilding them
//! over smaller version sets. Handles are shared (`Arc`) because the same
//! candidate can sit in several solver lists at once.

use crate::core::pattern::{PackagePattern, is_hash};
use crate::core::version::{Version, VersionSet};
use crate::definition::Definition;
use crate::environment::Environment;
use crate::error::{Result, SpockError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub type Aliases = BTreeSet<String>;
pub type PackageRef = Arc<Package>;

#[derive(Debug)]
pub enum Package {
    Installed(InstalledPackage),
    Ghost(GhostPackage),
}

#[derive(Debug)]
pub struct InstalledPackage {
    hash: String,
    name: String,
    aliases: Aliases,
    version: Version,
    dependencies: Vec<PackagePattern>,
    environment: Environment,
    timestamp: DateTime<Utc>,
    used: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct GhostPackage {
    defn: Arc<Definition>,
    name: String,
    aliases: Aliases,
    versions: VersionSet,
}

impl InstalledPackage {
    pub fn new(
        hash: String,
        name: String,
        aliases: Aliases,
        version: Version,
        dependencies: Vec<PackagePattern>,
        environment: Environment,
        timestamp: DateTime<Utc>,
        used: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if !is_hash(&hash) {
            return Err(SpockError::Syntax(format!("invalid package hash \"{hash}\"")));
        }
        if name.is_empty() {
            return Err(SpockError::Syntax("package name cannot be empty".into()));
        }
        if version.is_empty() {
            return Err(SpockError::Syntax(format!(
                "package {name} has no version number"
            )));
        }
        Ok(InstalledPackage {
            hash,
            name,
            aliases,
            version,
            dependencies,
            environment,
            timestamp,
            used,
        })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn dependencies(&self) -> &[PackagePattern] {
        &self.dependencies
    }

    /// Environment settings contributed when this package is employed.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// When some shell last employed this package; installation time when
    /// nothing has recorded a use yet.
    pub fn used_timestamp(&self) -> DateTime<Utc> {
        self.used.unwrap_or(self.timestamp)
    }

    /// Name, version, and hash: `boost=1.62.0@a1b2c3d4`.
    pub fn full_name(&self) -> String {
        format!("{}={}@{}", self.name, self.version, self.hash)
    }
}

impl GhostPackage {
    /// A ghost whose primary name may differ from its definition's, which
    /// is what makes a parasite a parasite.
    pub fn named(
        defn: Arc<Definition>,
        name: String,
        aliases: Aliases,
        versions: VersionSet,
    ) -> Result<Self> {
        if versions.is_empty() {
            return Err(SpockError::Syntax(format!(
                "ghost package {name} needs at least one version"
            )));
        }
        for v in versions.iter() {
            if !defn.is_supported_version(v) {
                return Err(SpockError::Conflict(format!(
                    "version {v} is not supported by the {} definition",
                    defn.name()
                )));
            }
        }
        Ok(GhostPackage {
            defn,
            name,
            aliases,
            versions,
        })
    }

    /// Copy this ghost onto a non-empty subset of its versions.
    pub fn with_versions(&self, versions: VersionSet) -> Result<Self> {
        if !self.versions.contains_all(&versions) {
            return Err(SpockError::Conflict(format!(
                "cannot widen ghost package {}",
                self.name
            )));
        }
        GhostPackage::named(self.defn.clone(), self.name.clone(), self.aliases.clone(), versions)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    /// Best (highest) version this ghost stands for.
    pub fn version(&self) -> &Version {
        self.versions.greatest().expect("ghost has at least one version")
    }

    pub fn is_valid_version(&self, v: &Version) -> bool {
        self.versions.contains(v)
    }

    pub fn is_parasite(&self) -> bool {
        self.name != self.defn.name()
    }

    /// Version parts shared by every version of this ghost.
    pub fn version_prefix(&self) -> Version {
        self.versions.common_prefix()
    }

    pub fn dependency_patterns(&self) -> Vec<PackagePattern> {
        if self.is_parasite() {
            // A parasite's only dependency is its host at a shared prefix.
            // `parasites()` rejects version classes with no common prefix,
            // so the spec always parses.
            let spec = format!("{}-{}", self.defn.name(), self.version_prefix());
            vec![
                PackagePattern::parse(&spec)
                    .expect("parasite version prefix is never empty"),
            ]
        } else {
            self.defn.dependency_patterns(self.version())
        }
    }

    /// One new ghost per parasite declared for this ghost's best version.
    /// A parasite is pinned to its host by a shared version prefix, so a
    /// version class whose members share no leading part cannot carry one.
    pub fn parasites(&self) -> Result<Vec<PackageRef>> {
        let mut retval = Vec::new();
        for decl in self.defn.parasites(self.version()) {
            let versions: VersionSet = if decl.version().is_empty() {
                self.versions.clone()
            } else {
                [decl.version().clone()].into_iter().collect()
            };
            if versions.common_prefix().is_empty() {
                return Err(SpockError::Conflict(format!(
                    "parasite {} cannot pin host {}: versions share no common prefix",
                    decl.name(),
                    self.name
                )));
            }
            let ghost = GhostPackage::named(
                self.defn.clone(),
                decl.name().to_string(),
                decl.aliases().clone(),
                versions,
            )?;
            retval.push(Arc::new(Package::Ghost(ghost)));
        }
        Ok(retval)
    }

    /// Hook for installing this ghost and its parasites. The shell-script
    /// runner lives outside the core; until it is wired up, parasite
    /// installation reports unsupported and host installation is delegated.
    pub fn install_parasite(&self) -> Result<PackageRef> {
        Err(SpockError::Command(
            "parasite installation is not supported".into(),
        ))
    }
}

impl Package {
    pub fn is_installed(&self) -> bool {
        matches!(self, Package::Installed(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Package::Installed(p) => p.name(),
            Package::Ghost(p) => p.name(),
        }
    }

    pub fn aliases(&self) -> &Aliases {
        match self {
            Package::Installed(p) => &p.aliases,
            Package::Ghost(p) => &p.aliases,
        }
    }

    /// Installation hash; empty for ghosts.
    pub fn hash(&self) -> &str {
        match self {
            Package::Installed(p) => p.hash(),
            Package::Ghost(_) => "",
        }
    }

    /// Primary version: the single installed version, or the best version
    /// of a ghost.
    pub fn version(&self) -> &Version {
        match self {
            Package::Installed(p) => p.version(),
            Package::Ghost(p) => p.version(),
        }
    }

    pub fn versions(&self) -> VersionSet {
        match self {
            Package::Installed(p) => [p.version().clone()].into_iter().collect(),
            Package::Ghost(p) => p.versions().clone(),
        }
    }

    pub fn dependency_patterns(&self) -> Vec<PackagePattern> {
        match self {
            Package::Installed(p) => p.dependencies().to_vec(),
            Package::Ghost(p) => p.dependency_patterns(),
        }
    }

    pub fn as_installed(&self) -> Option<&InstalledPackage> {
        match self {
            Package::Installed(p) => Some(p),
            Package::Ghost(_) => None,
        }
    }

    pub fn as_ghost(&self) -> Option<&GhostPackage> {
        match self {
            Package::Installed(_) => None,
            Package::Ghost(p) => Some(p),
        }
    }

    /// Names (primary plus aliases) shared by both packages.
    pub fn names_in_common(&self, other: &Package) -> Aliases {
        let mut mine: Aliases = self.aliases().clone();
        mine.insert(self.name().to_string());
        let mut theirs: Aliases = other.aliases().clone();
        theirs.insert(other.name().to_string());
        mine.intersection(&theirs).cloned().collect()
    }

    /// True if the packages are the same object, have the same non-empty
    /// hash, or have the same name and version set.
    pub fn identical(&self, other: &Package) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if !self.hash().is_empty() {
            return self.hash() == other.hash();
        }
        if self.name() != other.name() {
            return false;
        }
        self.versions() == other.versions()
    }

    /// True if the two packages can never be used at the same time. Only
    /// the packages themselves are consulted, not their dependencies.
    pub fn excludes(&self, other: &Package) -> bool {
        if self.name() != other.name() {
            // gnu-c++11 and gnu-c++03 both carry the alias c++-compiler,
            // which keeps them out of the same stack.
            return !self.names_in_common(other).is_empty();
        }
        if !self.hash().is_empty() && !other.hash().is_empty() {
            return self.hash() != other.hash();
        }
        if !self.version().is_empty() && !other.version().is_empty() {
            return self.versions().intersection(&other.versions()).is_empty();
        }
        false
    }

}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Package::Installed(p) => write!(f, "{}", p.full_name()),
            Package::Ghost(p) => {
                write!(f, "{}", p.name())?;
                if p.versions().len() > 1 {
                    let prefix = p.version_prefix();
                    if prefix.is_empty() {
                        write!(f, "=*")
                    } else {
                        write!(f, "={prefix}.*")
                    }
                } else {
                    write!(f, "={}", p.version())
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn spec_strings() {
        let b = installed("boost", "1.62.0", "aaaaaaaa", &[]);
        assert_eq!(b.to_string(), "boost=1.62.0@aaaaaaaa");

        let g = ghost("boost", &["1.62"]);
        assert_eq!(g.to_string(), "boost=1.62");

        let g = ghost("boost", &["1.60", "1.61", "1.62"]);
        assert_eq!(g.to_string(), "boost=1.*");

        let g = ghost("boost", &["1.2", "3.4"]);
        assert_eq!(g.to_string(), "boost=*");

        let g = ghost("boost", &["1.62.0", "1.62.1"]);
        assert_eq!(g.to_string(), "boost=1.62.*");
    }

    #[test]
    fn identity() {
        let a = installed("boost", "1.62", "aaaaaaaa", &[]);
        let b = installed("boost", "1.62", "bbbbbbbb", &[]);
        assert!(a.identical(&a));
        assert!(!a.identical(&b));

        let g1 = ghost("boost", &["1.62"]);
        let g2 = ghost("boost", &["1.62"]);
        let g3 = ghost("boost", &["1.60", "1.62"]);
        assert!(g1.identical(&g2));
        assert!(!g1.identical(&g3));

        // A ghost narrowed to the installed version counts as the same
        // requirement even though only one of them has a hash.
        assert!(g1.identical(&a));
    }

    #[test]
    fn exclusion_by_alias_overlap() {
        let new = installed_with_aliases("gnu-c++11", "6.3.0", "cccccccc", &[], &["c++-compiler"]);
        let old = installed_with_aliases("gnu-c++03", "6.3.0", "dddddddd", &[], &["c++-compiler"]);
        assert!(new.excludes(&old));
        assert!(old.excludes(&new));

        let unrelated = installed("boost", "1.62", "aaaaaaaa", &[]);
        assert!(!new.excludes(&unrelated));
    }

    #[test]
    fn exclusion_by_hash_and_versions() {
        let a = installed("gcc", "6.3.0", "aaaaaaaa", &[]);
        let b = installed("gcc", "6.3.0", "bbbbbbbb", &[]);
        assert!(a.excludes(&b));
        assert!(!a.excludes(&a));

        let g1 = ghost("boost", &["1.60", "1.61"]);
        let g2 = ghost("boost", &["1.62"]);
        let g3 = ghost("boost", &["1.61", "1.62"]);
        assert!(g1.excludes(&g2));
        assert!(!g1.excludes(&g3));
    }

    #[test]
    fn ghost_narrowing_rejects_widening() {
        let g = ghost("boost", &["1.60", "1.61"]);
        let g = g.as_ghost().unwrap();
        let narrower: VersionSet = [Version::parse("1.61")].into_iter().collect();
        assert!(g.with_versions(narrower).is_ok());
        let wider: VersionSet = [Version::parse("1.61"), Version::parse("1.99")]
            .into_iter()
            .collect();
        assert!(g.with_versions(wider).is_err());
    }

    #[test]
    fn names_in_common() {
        let a = installed_with_aliases("gnu-c++11", "6.3", "cccccccc", &[], &["c++-compiler"]);
        let b = installed_with_aliases("gnu-c++03", "6.3", "dddddddd", &[], &["c++-compiler"]);
        let common = a.names_in_common(&b);
        assert_eq!(common.len(), 1);
        assert!(common.contains("c++-compiler"));
    }
}
