// Listing and removal over an on-disk store.

use predicates::prelude::*;

mod common;
use common::{Store, manifest, stack_store};

#[test]
fn ls_lists_installed_packages_with_dependencies() {
    let store = stack_store();
    store
        .cmd()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("boost=1.62@aaaaaaaa"))
        .stdout(predicate::str::contains("gcc=6.3.0@bbbbbbbb"))
        .stdout(predicate::str::contains("spock=2@eeeeeeee"))
        .stdout(predicate::str::contains("    gcc=6.3.0@bbbbbbbb"));
}

#[test]
fn ls_top_hides_dependencies() {
    let store = stack_store();
    store
        .cmd()
        .args(["ls", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    spock=2@eeeeeeee").not());
}

#[test]
fn ls_filters_by_pattern() {
    let store = stack_store();
    store
        .cmd()
        .args(["ls", "-1", "boost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("boost=1.62@aaaaaaaa"))
        .stdout(predicate::str::contains("gcc").not());

    store
        .cmd()
        .args(["ls", "nonesuch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no package matching"));
}

#[test]
fn ls_ghosts_lists_installable_packages() {
    let store = Store::new();
    store.write_definition("zlib", "versions: ['1.2.8', '1.2.11']\n");
    store
        .cmd()
        .args(["ls", "--ghosts", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zlib=1.2.*"));
}

#[test]
fn ls_emits_json() {
    let store = stack_store();
    let output = store
        .cmd()
        .args(["ls", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let packages = parsed.as_array().unwrap();
    assert_eq!(packages.len(), 3);
    let boost = packages
        .iter()
        .find(|p| p["name"] == "boost")
        .expect("boost listed");
    assert_eq!(boost["hash"], "aaaaaaaa");
    assert_eq!(boost["installed"], true);
    assert_eq!(boost["dependencies"].as_array().unwrap().len(), 2);
}

#[test]
fn ls_writes_a_dependency_graph() {
    let store = stack_store();
    let dot = store.root.path().join("all.dot");
    store
        .cmd()
        .args(["ls", "--graph"])
        .arg(&dot)
        .assert()
        .success();
    let text = std::fs::read_to_string(&dot).unwrap();
    assert!(text.starts_with("digraph"));
    assert!(text.contains("spock=2@eeeeeeee"));
}

#[test]
fn rm_removes_a_leaf_package() {
    let store = stack_store();
    store
        .cmd()
        .args(["rm", "boost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removing boost=1.62@aaaaaaaa"));

    assert!(!store.manifest_exists("aaaaaaaa"));
    assert!(store.manifest_exists("bbbbbbbb"));
    assert!(store.manifest_exists("eeeeeeee"));
}

#[test]
fn rm_refuses_multiple_packages_without_force() {
    let store = stack_store();
    // Removing gcc would take boost with it.
    store
        .cmd()
        .args(["rm", "gcc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("refusing to remove"));
    assert!(store.manifest_exists("bbbbbbbb"));
    assert!(store.manifest_exists("aaaaaaaa"));
}

#[test]
fn rm_dry_run_lists_dependents() {
    let store = stack_store();
    store
        .cmd()
        .args(["rm", "--dry-run", "gcc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gcc=6.3.0@bbbbbbbb"))
        .stdout(predicate::str::contains("boost=1.62@aaaaaaaa"))
        .stdout(predicate::str::contains("spock").not());
    assert!(store.manifest_exists("bbbbbbbb"));
}

#[test]
fn rm_force_removes_dependents_first() {
    let store = stack_store();
    store
        .cmd()
        .args(["rm", "--force", "gcc"])
        .assert()
        .success();
    assert!(!store.manifest_exists("bbbbbbbb"));
    assert!(!store.manifest_exists("aaaaaaaa"));
    assert!(store.manifest_exists("eeeeeeee"));
}

#[test]
fn rm_removes_the_payload_directory() {
    let store = stack_store();
    let payload = store.optdir().join("aaaaaaaa");
    std::fs::create_dir_all(payload.join("lib")).unwrap();

    store.cmd().args(["rm", "boost"]).assert().success();
    assert!(!payload.exists());
}

#[test]
fn rm_stale_keeps_recently_used_packages() {
    let store = Store::new();
    // Installed long ago, never used since.
    store.write_manifest("aaaaaaaa", &manifest("old-tool", "1", &[]));
    // Installed long ago but used moments ago.
    let recent = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    store.write_manifest(
        "bbbbbbbb",
        &format!(
            "package: fresh-tool\nversion: '1'\ntimestamp: '2017-01-13 12:34:56'\nused: '{recent}'\n"
        ),
    );

    store
        .cmd()
        .args(["rm", "--dry-run", "--stale", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("old-tool=1@aaaaaaaa"))
        .stdout(predicate::str::contains("fresh-tool").not());
}
