use assert_cmd::Command;
use predicates::prelude::*;

mod common;
use common::{Store, stack_store};

// Helper function to initialize the command to test.
fn spock() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spock"))
}

#[test]
fn test_help_command() {
    let mut cmd = spock();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Per-user content-addressed package manager",
        ));
}

#[test]
fn test_version_flag() {
    let mut cmd = spock();
    let version = env!("CARGO_PKG_VERSION");
    let expected = format!("spock {}", version);

    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn test_unknown_command_fails() {
    let mut cmd = spock();
    cmd.arg("unknown-command-xyz")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: spock"));
}

#[test]
fn test_bad_pattern_exits_one() {
    let store = Store::new();
    store
        .cmd()
        .args(["shell", "-w", "foo==1", "--", "/bin/true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid package pattern"));
}

#[test]
fn test_using_is_quiet_when_nothing_is_employed() {
    let store = Store::new();
    store.cmd().arg("using").assert().success().stdout("");
}

#[test]
fn test_using_reads_the_employed_variable() {
    let store = stack_store();
    store
        .cmd()
        .arg("using")
        .env("SPOCK_EMPLOYED", "eeeeeeee:bbbbbbbb")
        .assert()
        .success()
        .stdout(predicate::str::contains("spock=2@eeeeeeee"))
        .stdout(predicate::str::contains("gcc=6.3.0@bbbbbbbb"))
        .stdout(predicate::str::contains("boost").not());
}

#[test]
fn test_using_filters_by_pattern() {
    let store = stack_store();
    store
        .cmd()
        .args(["using", "gcc"])
        .env("SPOCK_EMPLOYED", "eeeeeeee:bbbbbbbb")
        .assert()
        .success()
        .stdout(predicate::str::contains("gcc=6.3.0@bbbbbbbb"))
        .stdout(predicate::str::contains("spock").not());
}

#[test]
fn test_unknown_employed_hash_is_an_error() {
    let store = Store::new();
    store
        .cmd()
        .arg("using")
        .env("SPOCK_EMPLOYED", "deadbeef")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("deadbeef"));
}

#[test]
fn test_version_env_conflict() {
    let store = Store::new();
    store
        .cmd()
        .arg("using")
        .env("SPOCK_VERSION", "0.0.1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SPOCK_VERSION"));
}
