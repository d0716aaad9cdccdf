//! The shell command: solve, employ, launch.
//!
//! Solves the requested patterns together with whatever the surrounding
//! shell already employs, composes the environment from the chosen
//! packages, and runs a command (or an interactive shell) inside it.

use crate::constants::{EXIT_COMMAND_FAILED, EXIT_ERROR, EXIT_OK};
use crate::context::{Context, RunStatus, SubshellSettings};
use crate::core::package::PackageRef;
use crate::core::pattern::PackagePattern;
use crate::error::{Result, SpockError};
use crate::ui;
use std::io::Write;
use std::path::PathBuf;

pub struct ShellOptions {
    /// Change to this directory before doing anything.
    pub change_cwd: Option<PathBuf>,
    /// Package patterns to employ in the subshell.
    pub patterns: Vec<String>,
    /// Files with more whitespace-separated patterns; `#` starts a comment.
    pub pattern_files: Vec<PathBuf>,
    /// Write the chosen packages here, one spec per line.
    pub output: Option<PathBuf>,
    /// Write the solution's dependency graph here in GraphViz form.
    pub graph: Option<PathBuf>,
    /// Remind the user they are entering a new shell.
    pub welcome: bool,
    /// Command to run; empty means an interactive shell.
    pub command: Vec<String>,
}

pub fn run(options: ShellOptions) -> Result<i32> {
    if let Some(dir) = &options.change_cwd {
        std::env::set_current_dir(dir).map_err(|e| SpockError::io_at(dir, e))?;
    }

    let mut ctx = Context::new()?;
    let patterns = gather_patterns(&options)?;

    let solution = {
        let mut solver = ctx.solver();
        let n = solver.solve(&patterns)?;
        ui::debug(&format!("solver took {} steps", solver.n_steps()));
        if n == 0 {
            solver.show_messages();
            ui::error("no solutions found");
            return Ok(EXIT_ERROR);
        }
        solver.solution(0).to_vec()
    };

    if let Some(file) = &options.graph {
        let lattice = ctx.dependency_lattice(&solution)?;
        std::fs::write(file, lattice.to_graphviz()).map_err(|e| SpockError::io_at(file, e))?;
    }

    // Installing missing packages is the build runner's business; here a
    // ghost in the solution just means the stack is incomplete.
    let mut missing = false;
    for pkg in &solution {
        if pkg.is_installed() {
            ui::info(&format!("  using {pkg}"));
        } else {
            missing = true;
            ui::error(&format!("missing {pkg}"));
            if pkg.versions().len() > 1 {
                let available: Vec<String> =
                    pkg.versions().iter().map(|v| v.to_string()).collect();
                ui::info(&format!(
                    "  {} available versions: {}",
                    pkg.name(),
                    available.join(" ")
                ));
            }
        }
    }
    if missing {
        return Ok(EXIT_ERROR);
    }

    ctx.insert_employed_all(&solution)?;

    if let Some(file) = &options.output {
        write_solution_file(file, &solution)?;
    }

    if ui::is_interrupted() {
        return Err(SpockError::Command("operation cancelled".into()));
    }

    if options.welcome {
        println!();
        println!("You are being placed into a new subshell whose environment is configured");
        println!("as you have requested. You can customize it further by running more");
        println!("spock shell commands and dropping into deeper subshells; exit to return");
        println!("to your previous environment.");
        println!();
    }

    match ctx.subshell(&options.command, &SubshellSettings::default())? {
        RunStatus::Success => Ok(EXIT_OK),
        RunStatus::Failed => Ok(EXIT_COMMAND_FAILED),
        RunStatus::NotRun => {
            ui::error("command could not be executed");
            Ok(EXIT_ERROR)
        }
    }
}

fn gather_patterns(options: &ShellOptions) -> Result<Vec<PackagePattern>> {
    let mut specs = options.patterns.clone();
    for file in &options.pattern_files {
        let text = std::fs::read_to_string(file).map_err(|e| SpockError::io_at(file, e))?;
        for line in text.lines() {
            for word in line.split_whitespace() {
                if word.starts_with('#') {
                    break;
                }
                specs.push(word.to_string());
            }
        }
    }
    specs
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| PackagePattern::parse(s))
        .collect()
}

fn write_solution_file(file: &PathBuf, solution: &[PackageRef]) -> Result<()> {
    let mut out = std::fs::File::create(file).map_err(|e| SpockError::io_at(file, e))?;
    for pkg in solution {
        writeln!(out, "{pkg}").map_err(|e| SpockError::io_at(file, e))?;
    }
    Ok(())
}
