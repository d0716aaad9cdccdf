use colored::Colorize;
use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_MODE: OnceLock<ColorMode> = OnceLock::new();
static QUIET_MODE: AtomicBool = AtomicBool::new(false);
static VERBOSE_MODE: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, PartialEq)]
enum ColorMode {
    Auto,
    Never,
}

/// Initialize color mode from the environment.
/// Should be called once at startup.
pub fn init_colors() {
    let mode = if std::env::var_os("NO_COLOR").is_some() {
        ColorMode::Never
    } else {
        ColorMode::Auto
    };
    COLOR_MODE.get_or_init(|| mode);
}

/// Enable or disable quiet mode globally.
pub fn set_quiet(enabled: bool) {
    QUIET_MODE.store(enabled, Ordering::Relaxed);
}

/// Enable or disable verbose diagnostics globally.
pub fn set_verbose(enabled: bool) {
    VERBOSE_MODE.store(enabled, Ordering::Relaxed);
}

/// Mark an interruption request (e.g. Ctrl+C).
pub fn mark_interrupted() {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Check whether interruption was requested.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

fn is_verbose() -> bool {
    VERBOSE_MODE.load(Ordering::Relaxed)
}

/// Check if colors should be applied based on current mode
pub fn should_colorize() -> bool {
    match COLOR_MODE.get().copied().unwrap_or(ColorMode::Auto) {
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal(),
    }
}

/// Helper function to conditionally apply color
fn color_str(s: &str, colorizer: impl Fn(&str) -> colored::ColoredString) -> String {
    if should_colorize() {
        colorizer(s).to_string()
    } else {
        s.to_string()
    }
}

pub fn info(msg: &str) {
    if is_quiet() {
        return;
    }
    println!("{}", color_str(msg, |s| s.blue()));
}

pub fn warning(msg: &str) {
    let symbol = color_str("⚠", |s| s.yellow().bold());
    eprintln!("{} {}", symbol, msg);
}

pub fn error(msg: &str) {
    let symbol = color_str("✗", |s| s.red().bold());
    eprintln!("{} {}", symbol, msg);
}

/// Search traces and other diagnostics; visible with --verbose only.
pub fn debug(msg: &str) {
    if !is_verbose() {
        return;
    }
    eprintln!("{}", color_str(msg, |s| s.bright_black()));
}

/// One tick of the wait-for-child progress indicator.
pub fn progress_tick() {
    use std::io::Write;
    if is_quiet() {
        return;
    }
    eprint!(".");
    let _ = io::stderr().flush();
}

pub fn progress_done() {
    if is_quiet() {
        return;
    }
    eprintln!();
}
