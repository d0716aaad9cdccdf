//! Spock - per-user content-addressed package manager
//!
//! Declares which packages and versions should be "in use", finds a
//! mutually compatible set of installed packages, and launches a child
//! shell or command whose environment exposes the chosen stack.

fn main() {
    spock::run_cli();
}
