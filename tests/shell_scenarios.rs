// End-to-end scenarios for `spock shell`: solving against an on-disk
// store, environment composition, and exit-code mapping.

use predicates::prelude::*;

mod common;
use common::{Store, manifest, stack_store};

#[test]
fn runs_a_command_with_the_solved_stack() {
    let store = stack_store();
    store
        .cmd()
        .args(["shell", "-w", "boost", "-w", "gcc", "--", "/bin/true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("missing").not());
}

#[test]
fn writes_the_solution_file_in_dependency_order() {
    let store = stack_store();
    let out = store.root.path().join("solution.txt");
    store
        .cmd()
        .args(["shell", "-w", "boost", "-w", "gcc", "-o"])
        .arg(&out)
        .args(["--", "/bin/true"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "spock=2@eeeeeeee",
            "gcc=6.3.0@bbbbbbbb",
            "boost=1.62@aaaaaaaa",
        ]
    );
}

#[test]
fn composes_path_like_variables() {
    let store = Store::new();
    store.write_manifest(
        "aaaaaaaa",
        "package: aa\nversion: '1'\ntimestamp: '2017-01-13 12:34:56'\n\
         environment: {PATH: '/x:/a'}\n",
    );

    store
        .cmd()
        .env("PATH", "/a:/b")
        .args(["shell", "-w", "aa", "--", "/bin/sh", "-c", "echo \"$PATH\""])
        .assert()
        .success()
        .stdout(predicate::str::contains("/x:/a:/b"));
}

#[test]
fn nested_spock_sees_the_employed_packages() {
    let store = stack_store();
    store
        .cmd()
        .args(["shell", "-w", "boost", "--"])
        .arg(env!("CARGO_BIN_EXE_spock"))
        .arg("using")
        .assert()
        .success()
        .stdout(predicate::str::contains("boost=1.62@aaaaaaaa"))
        .stdout(predicate::str::contains("gcc=6.3.0@bbbbbbbb"))
        .stdout(predicate::str::contains("spock=2@eeeeeeee"));
}

#[test]
fn failing_command_exits_two() {
    let store = Store::new();
    store
        .cmd()
        .args(["shell", "--", "/bin/sh", "-c", "exit 5"])
        .assert()
        .code(2);
}

#[test]
fn unrunnable_command_exits_one() {
    let store = Store::new();
    store
        .cmd()
        .args(["shell", "--", "/no/such/binary-anywhere"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not be executed"));
}

#[test]
fn alias_conflict_has_no_solution() {
    let store = Store::new();
    store.write_manifest(
        "cccccccc",
        "package: gnu-c++11\nversion: '6.3.0'\ntimestamp: '2017-01-13 12:34:56'\n\
         aliases: [c++-compiler]\n",
    );
    store.write_manifest(
        "dddddddd",
        "package: gnu-c++03\nversion: '6.3.0'\ntimestamp: '2017-01-13 12:34:56'\n\
         aliases: [c++-compiler]\n",
    );

    // Both by primary name: impossible.
    store
        .cmd()
        .args(["shell", "-w", "gnu-c++11", "-w", "gnu-c++03", "--", "/bin/true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("overlapping aliases"));

    // Twice through the alias: one compiler satisfies both requests.
    store
        .cmd()
        .args([
            "shell",
            "-w",
            "c++-compiler",
            "-w",
            "c++-compiler",
            "--",
            "/bin/true",
        ])
        .assert()
        .success();
}

#[test]
fn missing_packages_stop_before_the_command() {
    let store = Store::new();
    // The installed core satisfies the ghost's implicit dependency; the
    // ghost itself is what is missing.
    store.write_manifest(
        "99999999",
        &manifest("spock", env!("CARGO_PKG_VERSION"), &[]),
    );
    store.write_definition("zlib", "versions: ['1.2.11']\n");
    store
        .cmd()
        .args(["shell", "-w", "zlib", "--", "/bin/true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing zlib=1.2.11"));
}

#[test]
fn pattern_files_contribute_patterns() {
    let store = stack_store();
    let list = store.root.path().join("stack.lst");
    std::fs::write(&list, "boost # the one true library\n# gcc stays out\n").unwrap();

    let out = store.root.path().join("solution.txt");
    store
        .cmd()
        .args(["shell", "--with-file"])
        .arg(&list)
        .arg("-o")
        .arg(&out)
        .args(["--", "/bin/true"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("boost=1.62@aaaaaaaa"));
    assert!(text.contains("gcc=6.3.0@bbbbbbbb"), "boost depends on gcc");
}

#[test]
fn graph_file_describes_the_solution() {
    let store = stack_store();
    let dot = store.root.path().join("deps.dot");
    store
        .cmd()
        .args(["shell", "-w", "boost", "--graph"])
        .arg(&dot)
        .args(["--", "/bin/true"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&dot).unwrap();
    assert!(text.starts_with("digraph"));
    assert!(text.contains("boost=1.62@aaaaaaaa"));
    assert!(text.contains("->"));
}

#[test]
fn employed_conflicts_are_detected_up_front() {
    let store = Store::new();
    store.write_manifest("aaaaaaaa", &manifest("gcc", "6.3.0", &[]));
    store.write_manifest("bbbbbbbb", &manifest("gcc", "5.4.0", &[]));

    // gcc 5.4 is already in use; a shell asking for gcc 6.3 cannot win.
    store
        .cmd()
        .env("SPOCK_EMPLOYED", "bbbbbbbb")
        .args(["shell", "-w", "gcc=6.3.0", "--", "/bin/true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no solutions found"));
}
