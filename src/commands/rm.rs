//! The rm command: remove installed packages and their dependents.
//!
//! Removing a package silently would strand everything built against it,
//! so removal walks the dependency lattice backwards and takes the
//! dependents too. Dependents are removed first; an interrupted run leaves
//! no package whose dependencies are gone.

use crate::constants::{EXIT_OK, EXIT_ERROR};
use crate::context::Context;
use crate::core::package::PackageRef;
use crate::core::pattern::PackagePattern;
use crate::error::{Result, SpockError};
use crate::ui;
use chrono::{Duration, Utc};
use std::collections::HashSet;

pub struct RmOptions {
    pub patterns: Vec<String>,
    /// Print what would be removed, but do not remove it.
    pub dry_run: bool,
    /// Allow removing more than one package at a time.
    pub force: bool,
    /// Only select packages unused for at least this many days.
    pub stale_days: Option<i64>,
}

pub fn run(options: RmOptions) -> Result<i32> {
    let mut ctx = Context::new()?;

    let mut packages = if options.patterns.is_empty() {
        ctx.find_installed(&PackagePattern::default())
    } else {
        let mut found = Vec::new();
        for spec in &options.patterns {
            let matched = ctx.find_installed(&PackagePattern::parse(spec)?);
            if matched.is_empty() {
                ui::warning(&format!("no package matching \"{spec}\""));
            } else {
                found.extend(matched);
            }
        }
        found
    };
    packages.sort_by_key(|p| p.to_string());
    packages.dedup_by(|a, b| a.to_string() == b.to_string());

    if let Some(days) = options.stale_days {
        let threshold = Utc::now() - Duration::days(days);
        packages.retain(|pkg| {
            pkg.as_installed()
                .map(|p| p.used_timestamp() <= threshold)
                .unwrap_or(false)
        });
    }

    // Walk the lattice of everything installed backwards from each target
    // to pick up the packages that depend on it.
    let everything = ctx.find_installed(&PackagePattern::default());
    let lattice = ctx.dependency_lattice(&everything)?;
    let mut to_remove: Vec<PackageRef> = Vec::new();
    for pkg in &packages {
        for spec in lattice.dependents_of(&pkg.to_string()) {
            let found = ctx.find_installed(&PackagePattern::parse(&spec)?);
            to_remove.extend(found);
        }
    }

    let distinct: HashSet<String> = to_remove.iter().map(|p| p.to_string()).collect();
    if distinct.len() > 1 && !options.force && !options.dry_run {
        ui::error(&format!(
            "refusing to remove multiple packages ({} total)",
            distinct.len()
        ));
        ui::error("use --dry-run to get a list; use --force to override");
        return Ok(EXIT_ERROR);
    }

    // Reverse discovery order removes dependents before their dependencies.
    let mut removed: HashSet<String> = HashSet::new();
    for pkg in to_remove.iter().rev() {
        if ui::is_interrupted() {
            return Err(SpockError::Command("operation cancelled".into()));
        }
        if !removed.insert(pkg.to_string()) {
            continue;
        }
        if options.dry_run {
            println!("{pkg}");
        } else {
            ui::info(&format!("removing {pkg}"));
            ctx.remove_package(pkg)?;
        }
    }
    Ok(EXIT_OK)
}
