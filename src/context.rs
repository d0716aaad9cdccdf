//! Runtime context.
//!
//! The context owns the package directory and a non-empty stack of
//! (environment, employed packages) pairs. Directory conventions come from
//! `SPOCK_*` variables, defaulted from the root and stamped back into the
//! top-level environment so a child process sees a fully determined world.

use crate::constants::*;
use crate::core::directory::{self, Directory};
use crate::core::lattice::DependencyLattice;
use crate::core::package::PackageRef;
use crate::core::pattern::PackagePattern;
use crate::core::solver::Solver;
use crate::core::version::Version;
use crate::environment::{DEFAULT_SEPARATOR, Environment};
use crate::error::{Result, SpockError};
use crate::manifest;
use crate::ui;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// One level of the environment stack: variables plus the ordered list of
/// employed packages that produced them.
#[derive(Debug, Clone, Default)]
pub struct EnvStackItem {
    vars: Environment,
    employed: Vec<PackageRef>,
}

/// How a subshell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    /// The command could not be executed at all.
    NotRun,
}

#[derive(Debug, Default)]
pub struct SubshellSettings {
    /// Redirect the child's stdout and stderr here (append, created if
    /// missing) and show a progress tick while waiting.
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Context {
    rootdir: PathBuf,
    bindir: PathBuf,
    scriptdir: PathBuf,
    pkgdir: PathBuf,
    vardir: PathBuf,
    optdir: PathBuf,
    blddir: PathBuf,
    downloaddir: PathBuf,
    hostname: String,
    self_spec: Option<String>,
    directory: Directory,
    env_stack: Vec<EnvStackItem>,
}

impl Context {
    /// Build a context from the process environment.
    pub fn new() -> Result<Context> {
        Context::with_environment(Environment::from_process())
    }

    /// Build a context from an explicit set of variables. Directory scans
    /// still hit the filesystem; everything else is taken from `vars`.
    pub fn with_environment(mut vars: Environment) -> Result<Context> {
        let runtime = vars.get(ENV_VERSION, "");
        if !runtime.is_empty() && runtime != VERSION {
            return Err(SpockError::Conflict(format!(
                "{ENV_VERSION} is {runtime} but this is spock {VERSION}"
            )));
        }

        let rootdir = match vars.get(ENV_ROOT, "") {
            s if !s.is_empty() => PathBuf::from(s),
            _ => directories::UserDirs::new()
                .map(|dirs| dirs.home_dir().join(USER_ROOT_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(SYSTEM_ROOT_DIR)),
        };
        let dir_or = |value: String, dflt: PathBuf| {
            if value.is_empty() { dflt } else { PathBuf::from(value) }
        };
        let bindir = dir_or(vars.get(ENV_BINDIR, ""), rootdir.join("bin"));
        let scriptdir = dir_or(vars.get(ENV_SCRIPTS, ""), rootdir.join("scripts"));
        let pkgdir = dir_or(vars.get(ENV_PKGDIR, ""), rootdir.join("lib").join("packages"));
        let vardir = dir_or(vars.get(ENV_VARDIR, ""), rootdir.join("var"));

        let hostname = match vars.get(ENV_HOSTNAME, "") {
            s if !s.is_empty() => s,
            _ => hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| UNKNOWN_HOSTNAME.to_string()),
        };

        let optdir = dir_or(
            vars.get(ENV_OPTDIR, ""),
            vardir.join("installed").join(&hostname),
        );
        let blddir = dir_or(vars.get(ENV_BLDDIR, ""), std::env::temp_dir());
        let downloaddir = vardir.join("downloads");

        vars.set(ENV_VERSION, VERSION);
        vars.set(ENV_ROOT, &rootdir.display().to_string());
        vars.set(ENV_BINDIR, &bindir.display().to_string());
        vars.set(ENV_SCRIPTS, &scriptdir.display().to_string());
        vars.set(ENV_PKGDIR, &pkgdir.display().to_string());
        vars.set(ENV_VARDIR, &vardir.display().to_string());
        vars.set(ENV_HOSTNAME, &hostname);
        vars.set(ENV_OPTDIR, &optdir.display().to_string());
        vars.set(ENV_BLDDIR, &blddir.display().to_string());

        let mut dir = Directory::new();
        dir.insert_all(manifest::scan(&optdir)?);
        dir.insert_all(crate::definition::scan(&pkgdir)?);

        // Self-discovery: which installation is the running core?
        let self_pattern = PackagePattern::exact("spock", &Version::parse(VERSION), "");
        let found = dir.find(&self_pattern, directory::installed);
        let discovered = found.first().map(|p| p.to_string());
        let advertised = vars.get(ENV_SPEC, "");
        let self_spec = match (&discovered, advertised.as_str()) {
            (Some(mine), theirs) if !theirs.is_empty() && theirs != mine.as_str() => {
                return Err(SpockError::Conflict(format!(
                    "{ENV_SPEC} is {theirs} but the installed core is {mine}"
                )));
            }
            (Some(mine), _) => Some(mine.clone()),
            (None, "") => None,
            (None, theirs) => Some(theirs.to_string()),
        };
        if let Some(spec) = &self_spec {
            vars.set(ENV_SPEC, spec);
        }

        // Packages already in use arrive as a hash list. Their environment
        // settings are already part of the inherited variables, so they are
        // recorded without being re-applied.
        let mut employed = Vec::new();
        for hash in vars
            .get(ENV_EMPLOYED, "")
            .split(EMPLOYED_READ_SEPARATORS)
            .filter(|h| !h.is_empty())
        {
            let pkg = dir.find_by_hash(hash).cloned().ok_or_else(|| {
                SpockError::NotFound(format!("package {hash} does not seem to be installed"))
            })?;
            employed.push(pkg);
        }

        Ok(Context {
            rootdir,
            bindir,
            scriptdir,
            pkgdir,
            vardir,
            optdir,
            blddir,
            downloaddir,
            hostname,
            self_spec,
            directory: dir,
            env_stack: vec![EnvStackItem { vars, employed }],
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.rootdir
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bindir
    }

    pub fn script_dir(&self) -> &Path {
        &self.scriptdir
    }

    pub fn pkg_dir(&self) -> &Path {
        &self.pkgdir
    }

    pub fn var_dir(&self) -> &Path {
        &self.vardir
    }

    pub fn opt_dir(&self) -> &Path {
        &self.optdir
    }

    pub fn build_dir(&self) -> &Path {
        &self.blddir
    }

    pub fn download_dir(&self) -> &Path {
        &self.downloaddir
    }

    pub fn host_name(&self) -> &str {
        &self.hostname
    }

    /// Spec string of the running core, when self-discovery found one.
    pub fn self_spec(&self) -> Option<&str> {
        self.self_spec.as_deref()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn top(&self) -> &EnvStackItem {
        self.env_stack.last().expect("environment stack is never empty")
    }

    fn top_mut(&mut self) -> &mut EnvStackItem {
        self.env_stack.last_mut().expect("environment stack is never empty")
    }

    /// Variables of the innermost environment.
    pub fn variables(&self) -> &Environment {
        &self.top().vars
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.top_mut().vars.set(name, value);
    }

    /// Packages employed at the innermost environment level.
    pub fn employed(&self) -> &[PackageRef] {
        &self.top().employed
    }

    pub fn find_packages(&self, pattern: &PackagePattern) -> Vec<PackageRef> {
        self.directory.find(pattern, directory::any)
    }

    pub fn find_installed(&self, pattern: &PackagePattern) -> Vec<PackageRef> {
        self.directory.find(pattern, directory::installed)
    }

    pub fn find_ghosts(&self, pattern: &PackagePattern) -> Vec<PackageRef> {
        self.directory.find(pattern, directory::not_installed)
    }

    /// A solver over this context's packages and employed set.
    pub fn solver(&self) -> Solver<'_> {
        Solver::new(&self.directory, self.employed())
    }

    pub fn dependency_lattice(&self, packages: &[PackageRef]) -> Result<DependencyLattice> {
        DependencyLattice::build(packages)
    }

    /// Sort so dependencies come before the packages that need them.
    pub fn sort_by_dependency_lattice(&self, packages: &mut [PackageRef]) -> Result<()> {
        DependencyLattice::build(packages)?.sort_packages(packages);
        Ok(())
    }

    /// Employ an installed package at the innermost level: prepend its
    /// environment settings, remember it, and extend SPOCK_EMPLOYED. A
    /// package that is already employed changes nothing.
    pub fn insert_employed(&mut self, pkg: &PackageRef) -> Result<bool> {
        let Some(installed) = pkg.as_installed() else {
            return Err(SpockError::Conflict(format!(
                "cannot employ {pkg}: it is not installed"
            )));
        };
        let spec = pkg.to_string();
        let top = self.top_mut();
        if top.employed.iter().any(|p| p.to_string() == spec) {
            return Ok(false);
        }
        top.vars.prepend_unique_env(installed.environment());
        top.employed.push(pkg.clone());
        top.vars
            .append_unique(ENV_EMPLOYED, installed.hash(), DEFAULT_SEPARATOR);
        Ok(true)
    }

    pub fn insert_employed_all(&mut self, pkgs: &[PackageRef]) -> Result<()> {
        for pkg in pkgs {
            self.insert_employed(pkg)?;
        }
        Ok(())
    }

    pub fn environment_stack_size(&self) -> usize {
        self.env_stack.len()
    }

    /// Enter a new scope: the top (variables, employed) pair is cloned.
    pub fn push_environment(&mut self) {
        let top = self.top().clone();
        self.env_stack.push(top);
    }

    /// Leave a scope. The outermost level is never popped.
    pub fn pop_environment(&mut self) {
        if self.env_stack.len() > 1 {
            self.env_stack.pop();
        }
    }

    /// Scope guard restoring the current stack depth on drop.
    pub fn saved_stack(&mut self) -> SavedStack<'_> {
        let depth = self.environment_stack_size();
        SavedStack {
            ctx: self,
            depth,
            forgotten: false,
        }
    }

    /// Forget an installed package. The on-disk manifest is removed first;
    /// then the package disappears from the directory index.
    pub fn remove_package(&mut self, pkg: &PackageRef) -> Result<()> {
        let Some(installed) = pkg.as_installed() else {
            return Err(SpockError::Conflict(format!(
                "cannot remove {pkg}: it is not installed"
            )));
        };
        manifest::remove(&self.optdir, installed.hash())?;
        self.directory.erase(pkg);
        Ok(())
    }

    /// Drop a package from the in-memory index only.
    pub fn deregister(&mut self, pkg: &PackageRef) {
        self.directory.erase(pkg);
    }

    /// Run a command in a child whose environment is the innermost
    /// environment of this context. An empty argv runs an interactive
    /// `$SHELL`. With `settings.output` set, the child's output is appended
    /// to that file and a once-a-second progress indicator ticks while
    /// waiting. `NotRun` means the command could not be executed.
    pub fn subshell(&self, argv: &[String], settings: &SubshellSettings) -> Result<RunStatus> {
        let vars = &self.top().vars;
        let mut command = if argv.is_empty() {
            Command::new(vars.get("SHELL", "/bin/bash"))
        } else {
            let mut c = Command::new(&argv[0]);
            c.args(&argv[1..]);
            c
        };

        command.env_clear();
        for (name, value) in vars.iter() {
            if !value.is_empty() {
                command.env(name, value);
            }
        }

        if let Some(path) = &settings.output {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SpockError::io_at(path, e))?;
            let file2 = file.try_clone().map_err(|e| SpockError::io_at(path, e))?;
            command.stdout(file);
            command.stderr(file2);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(_) => return Ok(RunStatus::NotRun),
        };

        let status = if settings.output.is_none() {
            child
                .wait()
                .map_err(|e| SpockError::Resource(format!("wait failed: {e}")))?
        } else {
            loop {
                match child
                    .try_wait()
                    .map_err(|e| SpockError::Resource(format!("wait failed: {e}")))?
                {
                    Some(status) => {
                        ui::progress_done();
                        break status;
                    }
                    None => {
                        ui::progress_tick();
                        std::thread::sleep(Duration::from_secs(1));
                    }
                }
            }
        };

        if status.success() {
            Ok(RunStatus::Success)
        } else if status.code() == Some(EXEC_FAILED_STATUS) {
            Ok(RunStatus::NotRun)
        } else {
            Ok(RunStatus::Failed)
        }
    }
}

/// Restores the environment-stack depth it was created at when dropped,
/// unless told to forget. Dereferences to the context so scoped code keeps
/// using it directly.
pub struct SavedStack<'a> {
    ctx: &'a mut Context,
    depth: usize,
    forgotten: bool,
}

impl SavedStack<'_> {
    /// Keep whatever the scope pushed.
    pub fn forget(&mut self) {
        self.forgotten = true;
    }
}

impl Drop for SavedStack<'_> {
    fn drop(&mut self) {
        if !self.forgotten {
            while self.ctx.environment_stack_size() > self.depth {
                self.ctx.pop_environment();
            }
        }
    }
}

impl std::ops::Deref for SavedStack<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl std::ops::DerefMut for SavedStack<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}
