pub mod cli;
pub mod commands;
pub mod constants;
pub mod context;
pub mod core;
pub mod definition;
pub mod environment;
pub mod error;
pub mod manifest;
pub mod ui;

use clap::Parser;
use std::process::exit;

/// Run the spock CLI entrypoint.
pub fn run_cli() {
    // 0. Initialize color settings (must be first)
    ui::init_colors();

    // 1. Signal handling: mark cancellation and let the command flow
    //    unwind safely; an interactive child shell handles its own SIGINT.
    ctrlc::set_handler(move || {
        eprintln!();
        ui::mark_interrupted();
        ui::warning("Operation cancelled by user.");
    })
    .expect("Error setting Ctrl-C handler");

    // 2. Parse & run
    let args = cli::args::Cli::parse();
    ui::set_quiet(args.global.quiet);
    ui::set_verbose(args.global.verbose);

    match cli::dispatcher::dispatch(&args) {
        Ok(code) => exit(code),
        Err(e) => {
            ui::error(&format!("{}", e));
            exit(constants::EXIT_ERROR);
        }
    }
}
