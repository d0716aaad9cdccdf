//! The using command: list the packages currently in use.

use crate::constants::EXIT_OK;
use crate::context::Context;
use crate::core::pattern::PackagePattern;
use crate::error::Result;

pub struct UsingOptions {
    /// Only list employed packages matching one of these.
    pub patterns: Vec<String>,
}

pub fn run(options: UsingOptions) -> Result<i32> {
    let ctx = Context::new()?;
    let patterns = options
        .patterns
        .iter()
        .map(|s| PackagePattern::parse(s))
        .collect::<Result<Vec<_>>>()?;

    for pkg in ctx.employed() {
        if patterns.is_empty() || patterns.iter().any(|p| p.matches(pkg)) {
            println!("{pkg}");
        }
    }
    Ok(EXIT_OK)
}
