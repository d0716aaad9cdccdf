//! Package definitions.
//!
//! A definition file under `SPOCK_PKGDIR` describes a whole family of
//! installable versions of one package. The core reads only what it needs
//! to reason about candidates: the supported versions, the per-version
//! dependency groups, and any parasite declarations. The download/build
//! shell blocks in the same file belong to the external build runner and
//! are ignored here.
//!
//! Versioned lists follow the manifest convention: every item carries a
//! `version` pattern, lookups take the *last* matching item, and ghost
//! grouping partitions the supported versions by the *first* matching item,
//! so versions with the same dependencies collapse into one ghost.

use crate::constants::VERSION;
use crate::core::package::{Aliases, GhostPackage, Package, PackageRef};
use crate::core::pattern::{PackagePattern, VersOp};
use crate::core::version::{Version, VersionSet};
use crate::error::{Result, SpockError};
use crate::ui;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    package: Option<String>,
    versions: Vec<String>,
    #[serde(default)]
    dependencies: Vec<DependencyItem>,
    #[serde(default, rename = "post-install")]
    post_install: Vec<PostInstallItem>,
}

#[derive(Debug, Deserialize)]
struct DependencyItem {
    version: String,
    #[serde(default)]
    install: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PostInstallItem {
    version: String,
    #[serde(default)]
    parasites: Vec<String>,
}

#[derive(Debug)]
struct DependencyGroup {
    applies: PackagePattern,
    install: Vec<PackagePattern>,
    aliases: Aliases,
}

#[derive(Debug)]
struct ParasiteGroup {
    applies: PackagePattern,
    parasites: Vec<ParasiteDecl>,
}

/// One parasite line from a definition: `NAME[=VERSION] ALIAS...`.
#[derive(Debug)]
pub struct ParasiteDecl {
    name: String,
    version: Version,
    aliases: Aliases,
}

impl ParasiteDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }
}

#[derive(Debug)]
pub struct Definition {
    name: String,
    file: PathBuf,
    versions: VersionSet,
    dependencies: Vec<DependencyGroup>,
    post_install: Vec<ParasiteGroup>,
    // Synthetic definitions (solver fixtures) have no backing file and no
    // implicit dependency on the core.
    synthetic: bool,
}

impl Definition {
    /// Read a definition file. The package name is the file stem; a
    /// `package` key, when present, must agree with it.
    pub fn load(name: &str, file: &Path) -> Result<Definition> {
        let text = std::fs::read_to_string(file).map_err(|e| SpockError::io_at(file, e))?;
        let parsed: DefinitionFile =
            serde_yml::from_str(&text).map_err(|e| SpockError::parse_in(file, e))?;

        if let Some(advertised) = &parsed.package
            && advertised.as_str() != name
        {
            return Err(SpockError::Conflict(format!(
                "package \"{advertised}\" conflicts with file name in {}",
                file.display()
            )));
        }

        let versions: VersionSet = parsed.versions.iter().map(|s| Version::parse(s)).collect();
        if versions.is_empty() {
            return Err(SpockError::parse_in(file, "versions cannot be empty"));
        }

        let mut dependencies = Vec::new();
        for item in &parsed.dependencies {
            let applies = PackagePattern::parse(&item.version)
                .map_err(|e| SpockError::parse_in(file, e))?;
            let install = item
                .install
                .iter()
                .map(|s| PackagePattern::parse(s).map_err(|e| SpockError::parse_in(file, e)))
                .collect::<Result<Vec<_>>>()?;
            dependencies.push(DependencyGroup {
                applies,
                install,
                aliases: item.aliases.iter().cloned().collect(),
            });
        }

        let mut post_install = Vec::new();
        for item in &parsed.post_install {
            let applies = PackagePattern::parse(&item.version)
                .map_err(|e| SpockError::parse_in(file, e))?;
            let parasites = item
                .parasites
                .iter()
                .map(|line| parse_parasite(name, line).map_err(|e| SpockError::parse_in(file, e)))
                .collect::<Result<Vec<_>>>()?;
            post_install.push(ParasiteGroup { applies, parasites });
        }

        Ok(Definition {
            name: name.to_string(),
            file: file.to_path_buf(),
            versions,
            dependencies,
            post_install,
            synthetic: false,
        })
    }

    /// An in-memory definition with no backing file; only tests need this.
    pub fn synthetic(name: &str, versions: &VersionSet) -> Definition {
        Definition {
            name: name.to_string(),
            file: PathBuf::new(),
            versions: versions.clone(),
            dependencies: Vec::new(),
            post_install: Vec::new(),
            synthetic: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    /// Exact-version membership test.
    pub fn is_supported_version(&self, v: &Version) -> bool {
        self.versions.contains(v)
    }

    /// Install-time dependencies for one supported version. A version with
    /// no declared dependencies depends on the running spock core.
    pub fn dependency_patterns(&self, version: &Version) -> Vec<PackagePattern> {
        let mut patterns = self
            .dependencies
            .iter()
            .rev()
            .find(|g| g.applies.matches_version(version))
            .map(|g| g.install.clone())
            .unwrap_or_default();
        if patterns.is_empty() && !self.synthetic {
            patterns.push(PackagePattern::exact(
                "spock",
                &Version::parse(VERSION),
                "",
            ));
        }
        patterns
    }

    /// Aliases the package advertises at one supported version.
    pub fn aliases_for(&self, version: &Version) -> Aliases {
        self.dependencies
            .iter()
            .rev()
            .find(|g| g.applies.matches_version(version))
            .map(|g| g.aliases.clone())
            .unwrap_or_default()
    }

    /// Parasites declared for one supported version.
    pub fn parasites(&self, version: &Version) -> &[ParasiteDecl] {
        self.post_install
            .iter()
            .rev()
            .find(|g| g.applies.matches_version(version))
            .map(|g| g.parasites.as_slice())
            .unwrap_or(&[])
    }

    /// Partition the supported versions into dependency-equivalence
    /// classes: each version joins the first dependency group that matches
    /// it. With no dependency groups at all, every version shares the
    /// default dependency and lands in a single class. Versions matched by
    /// no group are skipped with a warning.
    pub fn versions_by_dependency(&self) -> Vec<VersionSet> {
        if self.dependencies.is_empty() {
            return vec![self.versions.clone()];
        }

        let mut remaining: Vec<Version> = self.versions.iter().cloned().collect();
        let mut groups = Vec::new();
        for group in &self.dependencies {
            if remaining.is_empty() {
                break;
            }
            let (matched, rest): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|v| group.applies.matches_version(v));
            remaining = rest;
            if !matched.is_empty() {
                groups.push(matched.into_iter().collect());
            }
        }

        if !remaining.is_empty() {
            let stragglers: Vec<String> = remaining.iter().map(|v| v.to_string()).collect();
            ui::warning(&format!(
                "versions of {} missing dependency information in {}: {}",
                self.name,
                self.file.display(),
                stragglers.join(" ")
            ));
        }
        groups
    }

    /// Every candidate this definition contributes to the directory: one
    /// ghost per dependency-equivalence class, each followed by its
    /// parasites.
    pub fn ghosts(self: &Arc<Self>) -> Result<Vec<PackageRef>> {
        let mut retval = Vec::new();
        for class in self.versions_by_dependency() {
            let aliases = class
                .greatest()
                .map(|v| self.aliases_for(v))
                .unwrap_or_default();
            let host = GhostPackage::named(self.clone(), self.name.clone(), aliases, class)?;
            let host = Arc::new(Package::Ghost(host));
            let parasites = host
                .as_ghost()
                .map(|g| g.parasites())
                .transpose()?
                .unwrap_or_default();
            retval.push(host);
            retval.extend(parasites);
        }
        Ok(retval)
    }
}

/// Scan the definitions directory and return every candidate package the
/// definitions describe. Files that fail to parse are skipped with a
/// warning; a missing directory contributes nothing.
pub fn scan(pkgdir: &Path) -> Result<Vec<PackageRef>> {
    let mut retval = Vec::new();
    let entries = match std::fs::read_dir(pkgdir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(retval),
        Err(e) => return Err(SpockError::io_at(pkgdir, e)),
    };

    for entry in entries {
        let path = entry.map_err(|e| SpockError::io_at(pkgdir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(crate::constants::CONFIG_EXTENSION)
        {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match Definition::load(name, &path).map(Arc::new) {
            Ok(defn) => match defn.ghosts() {
                Ok(ghosts) => retval.extend(ghosts),
                Err(e) => ui::warning(&format!("skipping {}: {e}", path.display())),
            },
            Err(e) => ui::warning(&format!("skipping {}: {e}", path.display())),
        }
    }
    Ok(retval)
}

/// Parse one parasite line: the first word is a package spec whose version,
/// if any, must use `=` (or its `-` shorthand); the rest are aliases.
fn parse_parasite(host: &str, line: &str) -> Result<ParasiteDecl> {
    let mut words = line.split_whitespace();
    let spec = words
        .next()
        .ok_or_else(|| SpockError::Syntax("parasite line cannot be empty".into()))?;
    let pattern = PackagePattern::parse(spec)?;

    if pattern.name().is_empty() {
        return Err(SpockError::Syntax(format!("parasite \"{spec}\" needs a name")));
    }
    if pattern.name() == host {
        return Err(SpockError::Syntax(format!(
            "parasite \"{spec}\" cannot have same name as its host"
        )));
    }
    if !pattern.version().is_empty()
        && pattern.version_comparison() != VersOp::Eq
        && pattern.version_comparison() != VersOp::Hy
    {
        return Err(SpockError::Syntax(format!(
            "parasite \"{spec}\" must use '=' version"
        )));
    }

    Ok(ParasiteDecl {
        name: pattern.name().to_string(),
        version: pattern.version().clone(),
        aliases: words.map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_definition(dir: &Path, name: &str, text: &str) -> PathBuf {
        let file = dir.join(format!("{name}.yaml"));
        std::fs::write(&file, text).unwrap();
        file
    }

    #[test]
    fn loads_versions_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(
            dir.path(),
            "boost",
            "package: boost\n\
             versions: ['1.60', '1.61', '1.62']\n\
             dependencies:\n\
             \x20 - version: '-1'\n\
             \x20   install: ['gnu-c++11']\n",
        );
        let defn = Definition::load("boost", &file).unwrap();
        assert_eq!(defn.name(), "boost");
        assert_eq!(defn.versions().len(), 3);
        assert!(defn.is_supported_version(&Version::parse("1.61")));
        assert!(!defn.is_supported_version(&Version::parse("1.63")));

        let deps = defn.dependency_patterns(&Version::parse("1.62"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].to_string(), "gnu-c++11");
    }

    #[test]
    fn name_mismatch_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(dir.path(), "boost", "package: zlib\nversions: ['1']\n");
        assert!(matches!(
            Definition::load("boost", &file),
            Err(SpockError::Conflict(_))
        ));
    }

    #[test]
    fn default_dependency_is_the_core() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(dir.path(), "m4", "versions: ['1.4.18']\n");
        let defn = Definition::load("m4", &file).unwrap();
        let deps = defn.dependency_patterns(&Version::parse("1.4.18"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name(), "spock");
    }

    #[test]
    fn last_matching_dependency_group_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(
            dir.path(),
            "gcc",
            "versions: ['5.4.0', '6.3.0']\n\
             dependencies:\n\
             \x20 - version: '>=5'\n\
             \x20   install: ['binutils-2.25']\n\
             \x20 - version: '>=6'\n\
             \x20   install: ['binutils-2.28']\n",
        );
        let defn = Definition::load("gcc", &file).unwrap();
        let deps = defn.dependency_patterns(&Version::parse("6.3.0"));
        assert_eq!(deps[0].to_string(), "binutils-2.28");
        let deps = defn.dependency_patterns(&Version::parse("5.4.0"));
        assert_eq!(deps[0].to_string(), "binutils-2.25");
    }

    #[test]
    fn ghost_per_dependency_class() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(
            dir.path(),
            "gcc",
            "versions: ['5.4.0', '6.3.0', '6.4.0']\n\
             dependencies:\n\
             \x20 - version: '-5'\n\
             \x20   install: ['binutils-2.25']\n\
             \x20 - version: '-6'\n\
             \x20   install: ['binutils-2.28']\n",
        );
        let defn = Arc::new(Definition::load("gcc", &file).unwrap());
        let ghosts = defn.ghosts().unwrap();
        assert_eq!(ghosts.len(), 2);
        assert_eq!(ghosts[0].versions().len(), 1);
        assert_eq!(ghosts[1].versions().len(), 2);
    }

    #[test]
    fn parasites_are_parsed_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_definition(
            dir.path(),
            "gnu-compilers",
            "versions: ['6.3.0']\n\
             post-install:\n\
             \x20 - version: '-6'\n\
             \x20   parasites:\n\
             \x20     - 'gnu-c++11 c++-compiler'\n\
             \x20     - 'gnu-c89=6.3.0'\n",
        );
        let defn = Arc::new(Definition::load("gnu-compilers", &file).unwrap());
        let ghosts = defn.ghosts().unwrap();
        // Host plus two parasites.
        assert_eq!(ghosts.len(), 3);
        let parasite = ghosts[1].as_ghost().unwrap();
        assert!(parasite.is_parasite());
        assert_eq!(parasite.name(), "gnu-c++11");
        assert!(ghosts[1].aliases().contains("c++-compiler"));
        // The parasite depends on its host at a shared version prefix.
        let deps = parasite.dependency_patterns();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name(), "gnu-compilers");
        // The runner that would install parasites is not wired up.
        assert!(parasite.install_parasite().is_err());

        let bad = write_definition(
            dir.path(),
            "self-host",
            "versions: ['1']\n\
             post-install:\n\
             \x20 - version: '-1'\n\
             \x20   parasites: ['self-host']\n",
        );
        assert!(Definition::load("self-host", &bad).is_err());
    }

    #[test]
    fn parasite_needs_a_common_host_prefix() {
        let dir = tempfile::tempdir().unwrap();
        // One dependency class covering two unrelated version families: a
        // versionless parasite cannot pin the host to a shared prefix.
        let file = write_definition(
            dir.path(),
            "mixed",
            "versions: ['1.2', '3.4']\n\
             dependencies:\n\
             \x20 - version: '>=1'\n\
             \x20   install: ['m4-1.4']\n\
             post-install:\n\
             \x20 - version: '>=1'\n\
             \x20   parasites: ['mixed-extras']\n",
        );
        let defn = Arc::new(Definition::load("mixed", &file).unwrap());
        let err = defn.ghosts().unwrap_err();
        assert!(matches!(err, SpockError::Conflict(_)));
        assert!(err.to_string().contains("common prefix"));

        // Pinning the parasite to one exact version avoids the problem.
        let file = write_definition(
            dir.path(),
            "pinned",
            "versions: ['1.2', '3.4']\n\
             dependencies:\n\
             \x20 - version: '>=1'\n\
             \x20   install: ['m4-1.4']\n\
             post-install:\n\
             \x20 - version: '>=1'\n\
             \x20   parasites: ['pinned-extras=3.4']\n",
        );
        let defn = Arc::new(Definition::load("pinned", &file).unwrap());
        let ghosts = defn.ghosts().unwrap();
        assert_eq!(ghosts.len(), 2);
        let deps = ghosts[1].as_ghost().unwrap().dependency_patterns();
        assert_eq!(deps[0].to_string(), "pinned-3.4");
    }
}
