// Common constants used throughout the codebase

/// Version of the running spock core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Length of an installation hash (lowercase hexadecimal).
pub const HASH_LEN: usize = 8;

/// Extension of installed-package manifests and package definitions.
pub const CONFIG_EXTENSION: &str = "yaml";

/// Hidden per-user install root under $HOME.
pub const USER_ROOT_DIR_NAME: &str = ".spock";

/// System-wide fallback install root.
pub const SYSTEM_ROOT_DIR: &str = "/opt/spock";

/// Host name used when the system refuses to tell us one.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Environment variables consumed at context construction.
pub const ENV_VERSION: &str = "SPOCK_VERSION";
pub const ENV_ROOT: &str = "SPOCK_ROOT";
pub const ENV_BINDIR: &str = "SPOCK_BINDIR";
pub const ENV_SCRIPTS: &str = "SPOCK_SCRIPTS";
pub const ENV_PKGDIR: &str = "SPOCK_PKGDIR";
pub const ENV_VARDIR: &str = "SPOCK_VARDIR";
pub const ENV_HOSTNAME: &str = "SPOCK_HOSTNAME";
pub const ENV_OPTDIR: &str = "SPOCK_OPTDIR";
pub const ENV_BLDDIR: &str = "SPOCK_BLDDIR";
pub const ENV_SPEC: &str = "SPOCK_SPEC";
pub const ENV_EMPLOYED: &str = "SPOCK_EMPLOYED";

/// Separators accepted when reading SPOCK_EMPLOYED; written back with ':'.
pub const EMPLOYED_READ_SEPARATORS: &[char] = &[':', '-', ',', ' ', '\t'];

/// Exit status a child reserves for "could not exec the command".
pub const EXEC_FAILED_STATUS: i32 = 121;

/// Process exit codes surfaced by the CLI.
pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_COMMAND_FAILED: i32 = 2;
