use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "spock",
    about = "Per-user content-addressed package manager - build and compose versioned software stacks.",
    version,
    term_width = 100,
    max_term_width = 120
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct GlobalFlags {
    /// Verbose output, including solver traces
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command, or an interactive shell, with packages in use
    ///
    /// Finds a mutually compatible set of packages satisfying the given
    /// patterns plus whatever this shell already employs, then launches a
    /// subshell whose environment exposes the chosen stack. Exits 0 when
    /// the command succeeds, 2 when it ran but failed, and 1 for every
    /// failure before the command could be executed.
    Shell {
        /// Change to this directory before doing anything
        #[arg(short = 'C', value_name = "DIR")]
        directory: Option<PathBuf>,

        /// Package pattern to employ, e.g. boost-1.62 or gcc>=6
        #[arg(short = 'w', long = "with", value_name = "PATTERN")]
        with: Vec<String>,

        /// File with more patterns, whitespace separated, '#' comments
        #[arg(long = "with-file", value_name = "FILE")]
        with_file: Vec<PathBuf>,

        /// Write the chosen packages to this file, one spec per line
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write the solution's dependency graph as GraphViz
        #[arg(long, value_name = "FILE")]
        graph: Option<PathBuf>,

        /// Show a welcome message before starting the subshell
        #[arg(long)]
        welcome: bool,

        /// Command to run; interactive $SHELL when omitted
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// List packages that are in use
    Using {
        /// Only list employed packages matching these patterns
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },

    /// List installed packages
    Ls {
        /// Patterns to match; everything when omitted
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// List installable (ghost) packages instead
        #[arg(long)]
        ghosts: bool,

        /// Show top-level specs only, without dependencies
        #[arg(short = '1', long)]
        top: bool,

        /// Output format (json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Write a GraphViz dependency graph to this file
        #[arg(long, value_name = "FILE")]
        graph: Option<PathBuf>,
    },

    /// Remove installed packages and everything depending on them
    Rm {
        /// Patterns selecting the packages to remove
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Print what would be removed without removing it
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Allow removing more than one package
        #[arg(short = 'f', long)]
        force: bool,

        /// Only remove packages unused for at least this many days
        #[arg(long, value_name = "DAYS")]
        stale: Option<i64>,
    },
}
