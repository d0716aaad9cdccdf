//! The ls command: list installed or installable packages.

use crate::constants::EXIT_OK;
use crate::context::Context;
use crate::core::package::PackageRef;
use crate::core::pattern::PackagePattern;
use crate::error::{Result, SpockError};
use crate::ui;
use colored::Colorize;
use std::path::PathBuf;

pub struct LsOptions {
    pub patterns: Vec<String>,
    /// List installable (ghost) packages instead of installed ones.
    pub ghosts: bool,
    /// Show only the top-level specs, without their dependencies.
    pub top: bool,
    /// Output format; "json" or the default plain listing.
    pub format: Option<String>,
    /// Write the dependency graph of the listed packages here.
    pub graph: Option<PathBuf>,
}

pub fn run(options: LsOptions) -> Result<i32> {
    let ctx = Context::new()?;
    let packages = find_by_patterns(&ctx, &options)?;

    if let Some(file) = &options.graph {
        let lattice = ctx.dependency_lattice(&packages)?;
        std::fs::write(file, lattice.to_graphviz()).map_err(|e| SpockError::io_at(file, e))?;
    }

    match options.format.as_deref() {
        Some("json") => output_json(&packages)?,
        Some(other) => {
            return Err(SpockError::Command(format!(
                "unknown output format: '{other}'. Available: json"
            )));
        }
        None => output_plain(&packages, &options),
    }
    Ok(EXIT_OK)
}

fn find_by_patterns(ctx: &Context, options: &LsOptions) -> Result<Vec<PackageRef>> {
    let finder = |pattern: &PackagePattern| {
        if options.ghosts {
            ctx.find_ghosts(pattern)
        } else {
            ctx.find_installed(pattern)
        }
    };

    let mut retval = Vec::new();
    if options.patterns.is_empty() {
        retval = finder(&PackagePattern::default());
    } else {
        for spec in &options.patterns {
            let found = finder(&PackagePattern::parse(spec)?);
            if found.is_empty() {
                ui::warning(&format!("no package matching \"{spec}\""));
            } else {
                retval.extend(found);
            }
        }
    }
    retval.sort_by_key(|p| p.to_string());
    retval.dedup_by(|a, b| a.to_string() == b.to_string());
    Ok(retval)
}

fn output_plain(packages: &[PackageRef], options: &LsOptions) {
    for pkg in packages {
        println!("{}", colored_spec(pkg));
        if !options.top {
            for dep in pkg.dependency_patterns() {
                println!("    {dep}");
            }
        }
    }
}

// Version in cyan, hash in yellow, like every other spec this tool prints.
fn colored_spec(pkg: &PackageRef) -> String {
    if !ui::should_colorize() {
        return pkg.to_string();
    }
    let spec = pkg.to_string();
    match spec.split_once('=') {
        Some((name, rest)) => match rest.split_once('@') {
            Some((version, hash)) => {
                let version = format!("={version}");
                let hash = format!("@{hash}");
                format!("{name}{}{}", version.as_str().cyan(), hash.as_str().yellow())
            }
            None => {
                let version = format!("={rest}");
                format!("{name}{}", version.as_str().cyan())
            }
        },
        None => spec,
    }
}

fn output_json(packages: &[PackageRef]) -> Result<()> {
    let out: Vec<serde_json::Value> = packages
        .iter()
        .map(|pkg| {
            serde_json::json!({
                "spec": pkg.to_string(),
                "name": pkg.name(),
                "versions": pkg.versions().iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                "hash": if pkg.hash().is_empty() { None } else { Some(pkg.hash()) },
                "installed": pkg.is_installed(),
                "aliases": pkg.aliases().iter().collect::<Vec<_>>(),
                "dependencies": pkg
                    .dependency_patterns()
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
