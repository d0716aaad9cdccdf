// Shared fixtures: an on-disk package store in a temp directory and a
// spock command wired to use it. Not every test binary uses every helper.
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;

pub struct Store {
    pub root: tempfile::TempDir,
}

impl Store {
    pub fn new() -> Store {
        let root = tempfile::tempdir().unwrap();
        let store = Store { root };
        std::fs::create_dir_all(store.optdir()).unwrap();
        std::fs::create_dir_all(store.pkgdir()).unwrap();
        store
    }

    pub fn optdir(&self) -> PathBuf {
        self.root
            .path()
            .join("var")
            .join("installed")
            .join("testhost")
    }

    pub fn pkgdir(&self) -> PathBuf {
        self.root.path().join("lib").join("packages")
    }

    pub fn write_manifest(&self, hash: &str, text: &str) {
        std::fs::write(self.optdir().join(format!("{hash}.yaml")), text).unwrap();
    }

    pub fn write_definition(&self, name: &str, text: &str) {
        std::fs::write(self.pkgdir().join(format!("{name}.yaml")), text).unwrap();
    }

    pub fn manifest_exists(&self, hash: &str) -> bool {
        self.optdir().join(format!("{hash}.yaml")).exists()
    }

    /// A spock command seeing only this store.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_spock"));
        cmd.env("SPOCK_ROOT", self.root.path());
        cmd.env("SPOCK_HOSTNAME", "testhost");
        for stale in [
            "SPOCK_VERSION",
            "SPOCK_BINDIR",
            "SPOCK_SCRIPTS",
            "SPOCK_PKGDIR",
            "SPOCK_VARDIR",
            "SPOCK_OPTDIR",
            "SPOCK_BLDDIR",
            "SPOCK_SPEC",
            "SPOCK_EMPLOYED",
            "NO_COLOR",
        ] {
            cmd.env_remove(stale);
        }
        cmd
    }
}

/// Minimal manifest text for an installed package.
pub fn manifest(name: &str, version: &str, deps: &[&str]) -> String {
    let mut text = format!(
        "package: {name}\nversion: '{version}'\ntimestamp: '2017-01-13 12:34:56'\n"
    );
    if !deps.is_empty() {
        text.push_str("dependencies:\n");
        for dep in deps {
            text.push_str(&format!("  - {dep}\n"));
        }
    }
    text
}

/// A store holding a three-package stack: the core, a compiler depending on
/// it, and boost depending on both.
pub fn stack_store() -> Store {
    let store = Store::new();
    store.write_manifest("eeeeeeee", &manifest("spock", "2", &[]));
    store.write_manifest(
        "bbbbbbbb",
        &manifest("gcc", "6.3.0", &["spock=2@eeeeeeee"]),
    );
    store.write_manifest(
        "aaaaaaaa",
        &manifest("boost", "1.62", &["spock=2@eeeeeeee", "gcc=6.3.0@bbbbbbbb"]),
    );
    store
}
