//! Command dispatcher.
//!
//! Routes parsed CLI commands to their handlers. Handlers return the
//! process exit code so `shell` can distinguish "command ran but failed"
//! from errors of its own.

use crate::cli::args::{Cli, Command};
use crate::commands;
use crate::error::Result;

pub fn dispatch(args: &Cli) -> Result<i32> {
    match &args.command {
        Command::Shell {
            directory,
            with,
            with_file,
            output,
            graph,
            welcome,
            command,
        } => commands::shell::run(commands::shell::ShellOptions {
            change_cwd: directory.clone(),
            patterns: with.clone(),
            pattern_files: with_file.clone(),
            output: output.clone(),
            graph: graph.clone(),
            welcome: *welcome,
            command: command.clone(),
        }),

        Command::Using { patterns } => commands::using::run(commands::using::UsingOptions {
            patterns: patterns.clone(),
        }),

        Command::Ls {
            patterns,
            ghosts,
            top,
            format,
            graph,
        } => commands::ls::run(commands::ls::LsOptions {
            patterns: patterns.clone(),
            ghosts: *ghosts,
            top: *top,
            format: format.clone(),
            graph: graph.clone(),
        }),

        Command::Rm {
            patterns,
            dry_run,
            force,
            stale,
        } => commands::rm::run(commands::rm::RmOptions {
            patterns: patterns.clone(),
            dry_run: *dry_run,
            force: *force,
            stale_days: *stale,
        }),
    }
}
