//! Package patterns.
//!
//! A pattern has the form `{NAME}{OP VERSION}{@HASH}` where every piece is
//! optional. Parsing tries a fixed list of anchored grammar alternatives in
//! order and accepts the first that matches, which is what resolves the
//! ambiguity between a hyphenated name and a hyphen version introducer:
//! `foo-alpha` is a bare name, `foo-alpha.beta` is name `foo` with prefix
//! version `alpha.beta`, and `foo-1` is name `foo` with prefix version `1`.

use crate::core::package::Package;
use crate::core::version::Version;
use crate::error::{Result, SpockError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// Names are alphanumeric runs glued by "-", "+", or "_", where "-" can only
// appear internally. Version parts are the same without "+".
const NAME: &str = "[[:alnum:]]+(?:[-+_]+[[:alnum:]]+)*[_+]*";
const VERS_PART: &str = "[[:alnum:]]+(?:[-_]+[[:alnum:]]+)*";

/// Comparison operator applied to a pattern's version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Prefix match: "-2.5" matches 2.5, 2.5.0, 2.5.1, ...
    Hy,
}

impl VersOp {
    fn parse(s: &str) -> VersOp {
        match s {
            "!=" => VersOp::Ne,
            "<" => VersOp::Lt,
            "<=" => VersOp::Le,
            ">" => VersOp::Gt,
            ">=" => VersOp::Ge,
            "-" => VersOp::Hy,
            _ => VersOp::Eq,
        }
    }
}

impl fmt::Display for VersOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersOp::Eq => "=",
            VersOp::Ne => "!=",
            VersOp::Lt => "<",
            VersOp::Le => "<=",
            VersOp::Gt => ">",
            VersOp::Ge => ">=",
            VersOp::Hy => "-",
        };
        write!(f, "{s}")
    }
}

/// One grammar alternative: anchored regex plus the capture indexes for
/// (name, op, version, hash). Index 0 means "this alternative has no such
/// piece".
struct Alternative {
    re: Regex,
    name: usize,
    op: usize,
    version: usize,
    hash: usize,
}

static ALTERNATIVES: LazyLock<Vec<Alternative>> = LazyLock::new(|| {
    let dotted = format!("(?:{VERS_PART})(?:\\.(?:{VERS_PART}))+");
    let relaxed = format!("(?:{VERS_PART})(?:\\.(?:{VERS_PART}))*");
    let number = "[1-9][0-9]{0,5}";
    let dotted_or_number = format!("(?:{dotted})|(?:{number})");
    let vers_op = "!?=|<=?|>=?";
    let hash = "@([0-9a-f]{8})";

    let alt = |re: String, name, op, version, hash| Alternative {
        re: Regex::new(&re).expect("package pattern grammar"),
        name,
        op,
        version,
        hash,
    };

    vec![
        // The empty pattern matches every package.
        alt("^$".to_string(), 0, 0, 0, 0),
        // Only a hash: @12345678
        alt(format!("^{hash}$"), 0, 0, 0, 1),
        // Version with optional hash: >=1.2, -1.2, -alpha. No ambiguity with
        // names here since names cannot start with an operator or hyphen.
        alt(format!("^({vers_op}|-)({relaxed})(?:{hash})?$"), 0, 1, 2, 3),
        // Name, explicit operator, version, optional hash: yaml-cpp=alpha
        alt(format!("^({NAME})({vers_op})({relaxed})(?:{hash})?$"), 1, 2, 3, 4),
        // Name and hyphen-introduced version. The version is tighter (two or
        // more dotted parts, or a plain number) so that "foo-alpha" stays a
        // name while "foo-alpha.beta" and "foo-1" carry versions.
        alt(format!("^({NAME})(-)({dotted_or_number})(?:{hash})?$"), 1, 2, 3, 4),
        // Name with optional hash, no version.
        alt(format!("^({NAME})(?:{hash})?$"), 1, 0, 0, 2),
    ]
});

/// True for an eight-character lowercase hexadecimal installation hash.
pub fn is_hash(s: &str) -> bool {
    s.len() == crate::constants::HASH_LEN
        && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// A pattern that matches packages by name, version, and/or hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagePattern {
    name: String,
    op: VersOp,
    version: Version,
    hash: String,
}

impl PackagePattern {
    /// Parse a pattern, such as `boost`, `boost>=1.60`, `boost-1.62`,
    /// `@a1b2c3d4`, or `gnu-c++11=6.3.0@deadbeef`.
    pub fn parse(s: &str) -> Result<Self> {
        for alternative in ALTERNATIVES.iter() {
            if let Some(caps) = alternative.re.captures(s) {
                let grab = |i: usize| {
                    if i == 0 {
                        ""
                    } else {
                        caps.get(i).map_or("", |m| m.as_str())
                    }
                };
                return Ok(PackagePattern {
                    name: grab(alternative.name).to_string(),
                    op: VersOp::parse(grab(alternative.op)),
                    version: Version::parse(grab(alternative.version)),
                    hash: grab(alternative.hash).to_string(),
                });
            }
        }
        Err(SpockError::Syntax(format!("invalid package pattern \"{s}\"")))
    }

    /// Build the fully qualified pattern `NAME=VERSION@HASH` used for the
    /// dependency entries of installed packages.
    pub fn exact(name: &str, version: &Version, hash: &str) -> Self {
        PackagePattern {
            name: name.to_string(),
            op: VersOp::Eq,
            version: version.clone(),
            hash: hash.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_comparison(&self) -> VersOp {
        self.op
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Does the pattern's version constraint accept this version?
    pub fn matches_version(&self, haystack: &Version) -> bool {
        if self.version.is_empty() {
            return true;
        }
        match self.op {
            VersOp::Eq => *haystack == self.version,
            VersOp::Ne => *haystack != self.version,
            VersOp::Lt => *haystack < self.version,
            VersOp::Ge => *haystack >= self.version,
            VersOp::Le => *haystack <= self.version,
            VersOp::Gt => *haystack > self.version,
            VersOp::Hy => self.version.is_prefix_of(haystack),
        }
    }

    /// Does the pattern match a package? The name must equal the package's
    /// primary name or one of its aliases, the hash must agree when both are
    /// present, and the version constraint must accept the installed version
    /// or, for a ghost, any of its versions.
    pub fn matches(&self, pkg: &Package) -> bool {
        if !self.name.is_empty() && self.name != pkg.name() && !pkg.aliases().contains(&self.name) {
            return false;
        }
        if !self.hash.is_empty() && self.hash != pkg.hash() {
            return false;
        }
        match pkg {
            Package::Installed(installed) => self.matches_version(installed.version()),
            Package::Ghost(ghost) => ghost.versions().iter().any(|v| self.matches_version(v)),
        }
    }

}

impl fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.version.is_empty() {
            write!(f, "{}{}", self.op, self.version)?;
        }
        if !self.hash.is_empty() {
            write!(f, "@{}", self.hash)?;
        }
        Ok(())
    }
}

impl FromStr for PackagePattern {
    type Err = SpockError;

    fn from_str(s: &str) -> Result<Self> {
        PackagePattern::parse(s)
    }
}
