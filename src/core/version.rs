//! Dotted version numbers and ordered sets of them.
//!
//! A version number is a juxtaposition of parts separated by dots, as in
//! "1.56.4-alpha" where the parts are "1", "56", and "4-alpha". Parts that
//! look like small whole numbers compare numerically, everything else
//! compares as bytes.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Whole number version part? Only parts of at most six digits count.
fn whole_number(part: &str) -> Option<u32> {
    if part.is_empty() || part.len() > 6 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version {
    parts: Vec<String>,
}

impl Version {
    /// Parse a version from a string. The string is trimmed and split on
    /// dots; an empty string produces the empty version.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Version::default();
        }
        Version {
            parts: s.split('.').map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// True if every part of this version matches the leading parts of
    /// `other`. A requirement "2.5" is satisfied this way by "2.5",
    /// "2.5.0", "2.5.1", and so on, but not by "2.50".
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        self.len() <= other.len() && self.parts.iter().zip(&other.parts).all(|(a, b)| a == b)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.parts.iter().zip(&other.parts) {
            let ord = match (whole_number(a), whole_number(b)) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
                _ => a.cmp(b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.parts.len().cmp(&other.parts.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::parse(s)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Version::parse(s))
    }
}

/// An ordered set of version numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet {
    versions: BTreeSet<Version>,
}

impl VersionSet {
    pub fn new() -> Self {
        VersionSet::default()
    }

    pub fn insert(&mut self, v: Version) {
        self.versions.insert(v);
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.versions.contains(v)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    pub fn greatest(&self) -> Option<&Version> {
        self.versions.iter().next_back()
    }

    pub fn intersection(&self, other: &VersionSet) -> VersionSet {
        VersionSet {
            versions: self.versions.intersection(&other.versions).cloned().collect(),
        }
    }

    pub fn union(&self, other: &VersionSet) -> VersionSet {
        VersionSet {
            versions: self.versions.union(&other.versions).cloned().collect(),
        }
    }

    /// True if every member of `other` is also a member of this set.
    pub fn contains_all(&self, other: &VersionSet) -> bool {
        other.versions.is_subset(&self.versions)
    }

    /// The part-wise longest common prefix of all members. A part survives
    /// only while every version in the set agrees on it.
    pub fn common_prefix(&self) -> Version {
        let mut prefix: Option<Vec<String>> = None;
        for v in &self.versions {
            match &mut prefix {
                None => prefix = Some(v.parts().to_vec()),
                Some(parts) => {
                    let shared = parts
                        .iter()
                        .zip(v.parts())
                        .take_while(|(a, b)| *a == *b)
                        .count();
                    parts.truncate(shared);
                }
            }
        }
        Version {
            parts: prefix.unwrap_or_default(),
        }
    }
}

impl FromIterator<Version> for VersionSet {
    fn from_iter<T: IntoIterator<Item = Version>>(iter: T) -> Self {
        VersionSet {
            versions: iter.into_iter().collect(),
        }
    }
}
