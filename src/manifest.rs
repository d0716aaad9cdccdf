//! Installed-package manifests.
//!
//! Each installation `<hash>` is described by `OPTDIR/<hash>.yaml`; the
//! payload lives next to it under `OPTDIR/<hash>/`. Dependencies are stored
//! fully qualified (`NAME=VER@HASH`) so each one pins exactly one installed
//! package. Removal unlinks the manifest before the payload: an interrupted
//! remove leaves the package fully absent from the next Directory scan.

use crate::constants::CONFIG_EXTENSION;
use crate::core::package::{Aliases, InstalledPackage, Package, PackageRef};
use crate::core::pattern::{PackagePattern, VersOp, is_hash};
use crate::core::version::Version;
use crate::environment::Environment;
use crate::error::{Result, SpockError};
use crate::ui;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    package: Option<String>,
    version: Option<String>,
    timestamp: Option<String>,
    used: Option<String>,
    #[serde(default)]
    aliases: OneOrMany,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    environment: serde_yml::Mapping,
}

/// A scalar where a list is also welcome, as in `aliases: c++-compiler`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_set(self) -> Aliases {
        match self {
            OneOrMany::One(s) => [s].into_iter().collect(),
            OneOrMany::Many(v) => v.into_iter().collect(),
        }
    }
}

/// Path of the manifest for installation `hash`.
pub fn manifest_path(optdir: &Path, hash: &str) -> PathBuf {
    optdir.join(format!("{hash}.{CONFIG_EXTENSION}"))
}

/// Path of the installation prefix for `hash`.
pub fn payload_path(optdir: &Path, hash: &str) -> PathBuf {
    optdir.join(hash)
}

/// Accepts the original `2017-01-13 12:34:56` form as well as RFC 3339.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Load the manifest for one installation hash.
pub fn load(optdir: &Path, hash: &str) -> Result<InstalledPackage> {
    if !is_hash(hash) {
        return Err(SpockError::Syntax(format!("invalid package hash \"{hash}\"")));
    }
    let file = manifest_path(optdir, hash);
    if !file.exists() {
        return Err(SpockError::NotFound(format!(
            "package {hash} does not seem to be installed"
        )));
    }
    let text = std::fs::read_to_string(&file).map_err(|e| SpockError::io_at(&file, e))?;
    let parsed: ManifestFile =
        serde_yml::from_str(&text).map_err(|e| SpockError::parse_in(&file, e))?;

    let name = parsed
        .package
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SpockError::parse_in(&file, "no package name"))?;

    let version = Version::parse(parsed.version.as_deref().unwrap_or(""));
    if version.is_empty() {
        return Err(SpockError::parse_in(&file, "no package version"));
    }

    let timestamp = parsed
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| SpockError::parse_in(&file, "missing or malformed timestamp"))?;
    let used = match parsed.used.as_deref() {
        Some(s) => Some(
            parse_timestamp(s)
                .ok_or_else(|| SpockError::parse_in(&file, "malformed used timestamp"))?,
        ),
        None => None,
    };

    let mut dependencies = Vec::new();
    for spec in &parsed.dependencies {
        let pattern =
            PackagePattern::parse(spec).map_err(|e| SpockError::parse_in(&file, e))?;
        if pattern.name().is_empty()
            || pattern.version().is_empty()
            || pattern.hash().is_empty()
            || pattern.version_comparison() != VersOp::Eq
        {
            return Err(SpockError::parse_in(
                &file,
                format!("dependency \"{spec}\" is not fully qualified"),
            ));
        }
        dependencies.push(pattern);
    }

    let mut environment = Environment::new();
    for (key, value) in &parsed.environment {
        let name = key
            .as_str()
            .ok_or_else(|| SpockError::parse_in(&file, "environment keys must be strings"))?;
        let value = match value {
            serde_yml::Value::String(s) => s.clone(),
            serde_yml::Value::Number(n) => n.to_string(),
            serde_yml::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(SpockError::parse_in(
                    &file,
                    format!("environment variable {name} must be scalar"),
                ));
            }
        };
        environment.set(name, &value);
    }

    InstalledPackage::new(
        hash.to_string(),
        name,
        parsed.aliases.into_set(),
        version,
        dependencies,
        environment,
        timestamp,
        used,
    )
}

/// Scan the installed-packages directory. Files that are not manifests, or
/// manifests that fail to parse, are skipped with a warning; a missing
/// directory is simply an empty store.
pub fn scan(optdir: &Path) -> Result<Vec<PackageRef>> {
    let mut retval = Vec::new();
    let entries = match std::fs::read_dir(optdir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(retval),
        Err(e) => return Err(SpockError::io_at(optdir, e)),
    };

    for entry in entries {
        let path = entry.map_err(|e| SpockError::io_at(optdir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(CONFIG_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_hash(stem) {
            ui::warning(&format!("ignoring unrecognized file {}", path.display()));
            continue;
        }
        match load(optdir, stem) {
            Ok(pkg) => retval.push(Arc::new(Package::Installed(pkg))),
            Err(e) => ui::warning(&format!("skipping {}: {e}", path.display())),
        }
    }
    Ok(retval)
}

/// Remove one installation: the manifest first, so a crash half-way leaves
/// the package invisible, then the payload directory.
pub fn remove(optdir: &Path, hash: &str) -> Result<()> {
    let file = manifest_path(optdir, hash);
    std::fs::remove_file(&file).map_err(|e| SpockError::io_at(&file, e))?;
    let payload = payload_path(optdir, hash);
    match std::fs::remove_dir_all(&payload) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SpockError::io_at(&payload, e)),
    }
}
